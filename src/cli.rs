use clap::{Args, Parser, Subcommand};
use libris_catalog::{BookId, Pagination, Sort};
use libris_shelf::BookPatch;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "libris", version, about = "Ingest and browse an e-book library")]
pub struct Cli {
    /// Configuration file [default: libris.toml in the platform config directory]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add EPUB, FB2 or PDF files to the library
    Add {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// List books in the library
    List(PageArgs),
    /// Search title, author, publisher and ISBN
    Search {
        query: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show a single book
    Show { id: BookId },
    /// Change a book's metadata; empty values are ignored
    Edit {
        id: BookId,
        #[command(flatten)]
        patch: EditArgs,
    },
    /// Copy a book's file out of the library
    Download {
        id: BookId,
        /// Destination file, or a directory to place `<id>.<format>` in
        dest: PathBuf,
    },
    /// Copy a book's cover image out of the library
    Cover { id: BookId, dest: PathBuf },
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// title, author, publisher, year, created_at, updated_at or isbn
    #[arg(long, default_value = "created_at")]
    pub sort: String,
    /// asc or desc
    #[arg(long, default_value = "desc")]
    pub order: String,
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,
    #[arg(long, default_value_t = 25, allow_negative_numbers = true)]
    pub per_page: i64,
}

impl PageArgs {
    pub fn sort(&self) -> Sort {
        Sort::parse(&self.sort, &self.order)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub publisher: Option<String>,
    #[arg(long)]
    pub year: Option<u32>,
    #[arg(long, conflicts_with = "clear_isbn")]
    pub isbn: Option<String>,
    /// Remove the stored ISBN
    #[arg(long)]
    pub clear_isbn: bool,
}

impl From<EditArgs> for BookPatch {
    fn from(args: EditArgs) -> Self {
        Self {
            title: args.title,
            author: args.author,
            publisher: args.publisher,
            year: args.year,
            isbn: if args.clear_isbn { Some(String::new()) } else { args.isbn },
        }
    }
}
