//! Bookshelf example
//!
//! Serves list, edit and delete fragments for books and authors from an
//! in-memory store:
//!
//! ```text
//! RUST_LOG=crud=debug,tower_http=debug cargo run --example bookshelf
//! ```

use anyhow::Result;
use crud::prelude::*;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = include_str!("cruds.yaml");

fn book_type() -> EntityType {
    EntityType::new(
        EntityMetadata::new("Book")
            .field("title")
            .field("year")
            .field("isbn")
            .field("available")
            .association("author"),
        SimpleFormType::new("book")
            .field(FormField::text("title").required().filter(filters::trim()))
            .field(
                FormField::integer("year")
                    .label("Publication year")
                    .validator(validators::positive()),
            )
            .field(FormField::text("isbn").label("ISBN").filter(filters::uppercase()))
            .field(FormField::textarea("summary"))
            .field(FormField::boolean("available")),
    )
    .with_factory(|| {
        json!({ "title": null, "year": null, "isbn": null, "summary": null, "available": true })
            .as_object()
            .cloned()
            .unwrap_or_default()
    })
}

fn author_type() -> EntityType {
    EntityType::new(
        EntityMetadata::new("Author").field("name").field("email").field("born"),
        SimpleFormType::new("author")
            .field(FormField::text("name").required())
            .field(FormField::email("email"))
            .field(FormField::date("born")),
    )
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

fn populate(store: &InMemoryPersistence) -> Result<()> {
    let books = book_type();
    for (title, year) in [
        ("Dune", 1965),
        ("Foundation", 1951),
        ("Hyperion", 1989),
        ("The Left Hand of Darkness", 1969),
        ("Neuromancer", 1984),
    ] {
        store.seed(
            books.metadata(),
            record(json!({ "title": title, "year": year, "available": true })),
        )?;
    }

    store.seed(
        author_type().metadata(),
        record(json!({ "name": "Ursula K. Le Guin", "email": "ursula@example.org", "born": "1929-10-21" })),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crud=info")),
        )
        .init();

    let store = InMemoryPersistence::new();
    populate(&store)?;

    let mut translator = CatalogTranslator::new("en");
    translator.add_message("book", "title", "Title");
    translator.add_message("book", "year", "Year");
    translator.add_message("author", "name", "Name");
    translator.add_message("author", "email", "E-mail");

    println!("Bookshelf running on http://127.0.0.1:3000");
    println!("  GET      /crud/book/list");
    println!("  GET|POST /crud/book/new");
    println!("  GET|POST /crud/book/{{id}}/edit");
    println!("  POST     /crud/book/{{id}}/drop");
    println!("  (same routes for /crud/author)");

    ServerBuilder::new()
        .with_persistence(store)
        .with_translator(translator)
        .register_entity(book_type())
        .register_entity(author_type())
        .with_config(CrudsConfig::from_yaml_str(CONFIG)?)
        .serve("127.0.0.1:3000")
        .await
}
