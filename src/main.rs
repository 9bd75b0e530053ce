mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use libris_catalog::{Book, Database, PoolSettings, Repository};
use libris_config::Config;
use libris_shelf::{BookShelf, PaginatedBookList, Stored};
use libris_storage::BoxSyncRead;
use libris_storage::backend::LocalBackend;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let db = open_catalog(&config).await?;
    let storage = LocalBackend::new(&config.storage.name, &config.storage.root).or_raise(|| ErrorKind::Storage)?;
    let shelf = BookShelf::new(Arc::new(storage), Arc::new(Repository::from(&db)));
    tracing::debug!(
        database = %config.database.path.display(),
        storage = %config.storage.root.display(),
        "opened library"
    );

    let result = execute(&shelf, cli.command).await;
    db.close().await;
    result
}

async fn open_catalog(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Catalog)?;
    }
    let settings = PoolSettings {
        max_connections: config.database.max_connections,
        busy_timeout: config.database.busy_timeout(),
    };
    Database::connect_with(&config.database.path, settings)
        .await
        .or_raise(|| ErrorKind::Catalog)
}

async fn execute(shelf: &BookShelf, command: Command) -> Result<()> {
    match command {
        Command::Add { files } => {
            for file in files {
                let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                match shelf.store_book(&file, &name).await.or_raise(|| ErrorKind::Shelf)? {
                    Stored::Created(book) => println!("added\t{}", summary(&book)),
                    Stored::AlreadyExists(book) => println!("exists\t{}", summary(&book)),
                }
            }
        },
        Command::List(page) => {
            let list = shelf.list_books(page.sort(), page.pagination()).await.or_raise(|| ErrorKind::Shelf)?;
            print_page(&list);
        },
        Command::Search { query, page } => {
            let list = shelf
                .search_books(&query, page.sort(), page.pagination())
                .await
                .or_raise(|| ErrorKind::Shelf)?;
            print_page(&list);
        },
        Command::Show { id } => {
            let book = shelf.view_book(id).await.or_raise(|| ErrorKind::Shelf)?;
            print_book(&book);
        },
        Command::Edit { id, patch } => {
            let book = shelf
                .update_book_metadata(id, patch.into())
                .await
                .or_raise(|| ErrorKind::Shelf)?;
            print_book(&book);
        },
        Command::Download { id, dest } => {
            let (book, reader) = shelf.download_book(id).await.or_raise(|| ErrorKind::Shelf)?;
            let dest = if dest.is_dir() { dest.join(format!("{}.{}", book.id, book.format)) } else { dest };
            copy_out(reader, dest).await?;
        },
        Command::Cover { id, dest } => {
            let reader = shelf.view_cover(id).await.or_raise(|| ErrorKind::Shelf)?;
            let dest = if dest.is_dir() { dest.join(format!("{id}.jpg")) } else { dest };
            copy_out(reader, dest).await?;
        },
    }
    Ok(())
}

/// Storage hands out blocking readers; drain one into `dest` off the runtime.
async fn copy_out(mut reader: BoxSyncRead, dest: PathBuf) -> Result<()> {
    let written = tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::create(&dest)?;
        std::io::copy(&mut reader, &mut file).map(|n| (n, dest))
    })
    .await
    .or_raise(|| ErrorKind::Output)?
    .or_raise(|| ErrorKind::Output)?;
    println!("wrote {} bytes to {}", written.0, written.1.display());
    Ok(())
}

fn summary(book: &Book) -> String {
    format!("{}\t{}\t{}\t{}", book.id, book.format, book.title, book.author)
}

fn print_page(list: &PaginatedBookList) {
    for book in &list.books {
        println!("{}", summary(book));
    }
    println!(
        "page {} of {} ({} books)",
        list.page,
        list.total_pages().max(1),
        list.total_count
    );
    match (list.has_previous_page(), list.has_next_page()) {
        (true, true) => println!("more: --page {} or --page {}", list.page - 1, list.page + 1),
        (true, false) => println!("more: --page {}", list.page - 1),
        (false, true) => println!("more: --page {}", list.page + 1),
        (false, false) => {},
    }
}

fn print_book(book: &Book) {
    let field = |name: &str, value: &dyn std::fmt::Display| println!("{:<13}{value}", format!("{name}:"));
    field("id", &book.id);
    field("title", &book.title);
    field("author", &book.author);
    field("publisher", &book.publisher);
    if book.year > 0 {
        field("year", &book.year);
    }
    field("isbn", &book.isbn);
    field("format", &book.format);
    field("fingerprint", &book.file_hash);
    field("file", &book.file_path.display());
    if let Some(cover) = book.cover_path.as_deref().filter(|_| book.has_cover()) {
        field("cover", &cover.display());
    }
    field("added", &book.created_at);
    field("updated", &book.updated_at);
}
