use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use todo_server::config::Config;
use todo_server::store::Store;

const CQL_PORT: u16 = 9042;

pub async fn setup_container() -> anyhow::Result<ContainerAsync<GenericImage>> {
    let container = GenericImage::new("scylladb/scylla", "6.2")
        .with_exposed_port(CQL_PORT.tcp())
        .with_wait_for(WaitFor::message_on_stdout(
            "Starting listening for CQL clients",
        ))
        .with_cmd(["--smp", "1", "--developer-mode", "1"])
        .start()
        .await?;
    Ok(container)
}

pub async fn setup_store(container: &ContainerAsync<GenericImage>) -> anyhow::Result<Store> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(CQL_PORT).await?;
    let config = Config {
        db_node: format!("{}:{}", host, port),
        keyspace: "todo".to_string(),
        replication_factor: 1,
        port: 8080,
    };
    let store = Store::connect(&config).await?;
    Ok(store)
}
