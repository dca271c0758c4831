#![allow(dead_code)]

use tokio_postgres::NoTls;

/// Connect to `DATABASE_URL`, or `None` (with a note on stderr) when unset.
pub async fn try_connect(test: &str) -> Option<tokio_postgres::Client> {
    let _ = dotenvy::dotenv();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return None;
        }
    };
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .expect("connect to DATABASE_URL");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Some(client)
}
