use clap::Parser;
use std::path::PathBuf;

/// Graphchat - chat with a knowledge graph through a language model
#[derive(Parser, Debug, Clone)]
#[command(name = "graphchat", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "GRAPHCHAT_CONFIG", default_value = "graphchat.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "GRAPHCHAT_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "GRAPHCHAT_PORT")]
    pub port: Option<u16>,

    /// Base URL of the graph store
    #[arg(long, env = "GRAPHCHAT_GRAPH_URL")]
    pub graph_url: Option<String>,

    /// Repository holding the knowledge graph
    #[arg(long, env = "GRAPHCHAT_REPOSITORY")]
    pub repository: Option<String>,
}
