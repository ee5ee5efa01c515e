use log::info;
use mongodb::{options::ClientOptions, Client, Database};

/// Handle to the marketplace database. The driver connects lazily, so init
/// only validates the connection string.
pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client =
            Client::with_options(options).expect("Failed to initialize MongoDB client");
        info!("Using database: {}", db_name);
        MongoDB {
            db: client.database(db_name),
        }
    }
}
