pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        #[serde(default = "default_db_node")]
        pub db_node: String,
        #[serde(default = "default_keyspace")]
        pub keyspace: String,
        #[serde(default = "default_replication_factor")]
        pub replication_factor: u8,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_db_node() -> String {
        "127.0.0.1:9042".to_string()
    }

    fn default_keyspace() -> String {
        "todo".to_string()
    }

    fn default_replication_factor() -> u8 {
        1
    }

    fn default_port() -> u16 {
        8080
    }
}

pub mod store;
pub mod todo;
pub mod web;
