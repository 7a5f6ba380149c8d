//! Example consumer: a bookstore served by endpoint-sdk.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! With `DATABASE_URL` set, books live in PostgreSQL (table `"Book"`); otherwise in memory.

use endpoint_sdk::{
    app, common_routes_with_ready, load_from_path, resolve, AppError, Dal, Endpoints, MemoryDal, PgDal,
    RequestContext, Settings,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

const BOOK_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/book.json");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("endpoint_sdk=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let path = std::env::var("BOOK_CONFIG").unwrap_or_else(|_| BOOK_CONFIG.into());
    let entity = resolve(&load_from_path(&path).await?)?;

    let dal: Arc<dyn Dal> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            Arc::new(PgDal::new(pool, entity))
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set; serving books from memory");
            let memory = MemoryDal::new(entity);
            memory.seed(
                vec![
                    json!({ "Title": "The Hunger Games", "Type": "Novel", "Genre": "Dystopia", "PublicationYear": 2008 }),
                    json!({ "Title": "Dune", "Type": "Novel", "Genre": "Science Fiction", "PublicationYear": 1965 }),
                    json!({ "Title": "Leaves of Grass", "Type": "Poetry", "Genre": "Poetry", "PublicationYear": 1855 }),
                ],
                1,
            )?;
            Arc::new(memory)
        }
    };

    let books = Arc::new(Endpoints::new(dal, settings));
    books.set_template("SelectList", "<%= Record.Title %> (<%= Record.PublicationYear %>)");
    books.set_behavior("Reads-QueryConfiguration", |ctx: &mut RequestContext| -> Result<(), AppError> {
        if ctx.query.sort.is_empty() {
            ctx.query.add_sort("Title", endpoint_sdk::dal::SortDirection::Ascending);
        }
        Ok(())
    });
    books.set_behavior("Read-PostOperation", |ctx: &mut RequestContext| -> Result<(), AppError> {
        if let Some(Value::Object(book)) = ctx.record.as_mut() {
            let year = book.get("PublicationYear").and_then(Value::as_i64).unwrap_or(0);
            book.insert("Classic".into(), Value::Bool(year > 0 && year < 1950));
        }
        Ok(())
    });

    let router = app([books.clone()]).merge(common_routes_with_ready(books));
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Bookstore listening on http://127.0.0.1:{}/1.0/Books", port);
    axum::serve(listener, router).await?;
    Ok(())
}
