use archer::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut _guard = None;

    if std::env::var("ROUTER_LOG").unwrap_or_default() == "true" {
        let file_appender = tracing_appender::rolling::RollingFileAppender::new(
            tracing_appender::rolling::Rotation::DAILY,
            "./logs",
            "archerclient.log",
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::writer::MakeWriterExt::and(
                non_blocking,
                std::io::stderr,
            ))
            .with_target(false)
            .with_env_filter("info")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%dT%H:%M:%S".to_string(),
            ))
            .init();

        _guard = Some(guard);
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_env_filter("info")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%dT%H:%M:%S".to_string(),
            ))
            .init();
    }

    let mut args = std::env::args().skip(1);
    let (Some(host), Some(password)) = (args.next(), args.next()) else {
        eprintln!("usage: archerclient <host> <password>");
        std::process::exit(2);
    };

    tracing::info!("logging in to {}", host);
    let mut client = Client::new(&host)?;
    client.login(&password).await?;

    let devices = client.client_list().await?;
    println!("{}", serde_json::to_string_pretty(&devices)?);

    client.logout().await?;
    Ok(())
}
