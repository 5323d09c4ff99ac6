/// Clique tree construction errors. Fatal at build time.
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    #[error("clique graph is not a tree: {cliques} cliques, {edges} edges, connected = {connected}")]
    NotATree {
        cliques: usize,
        edges: usize,
        connected: bool,
    },

    #[error("no clique covers the family of variable {variable}")]
    MissingFamilyClique { variable: String },

    #[error("cannot build a clique tree for a model without variables")]
    EmptyModel,

    #[error("clique tree was built for structure {tree_stamp}, model is at {model_stamp}")]
    StaleTree { tree_stamp: u64, model_stamp: u64 },
}
