//! `library-client`: command-line access to the library services with
//! offline fallback.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;

use library_client::domain::ports::RemoteClient;
use library_client::domain::{
    Book, EntityId, Loan, Provenance, Transition, TransitionOutcome, TransitionResult,
};
use library_client::{ClientSettings, LibraryServices, telemetry};

/// `library-client` command arguments. Service URLs, storage and policy come
/// from `LIBRARY_*` environment variables.
#[derive(Debug, Parser)]
#[command(
    name = "library-client",
    about = "Library catalogue and loans with offline fallback",
    version
)]
struct CliArgs {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh every cache from its service.
    Sync,
    /// List the catalogue.
    Books {
        /// Title or author search.
        #[arg(long)]
        search: Option<String>,
        /// Restrict to one category (`all` for every category).
        #[arg(long)]
        category: Option<String>,
    },
    /// List loans.
    Loans {
        /// Only loans of this user.
        #[arg(long)]
        user: Option<String>,
        /// Only loans awaiting a decision.
        #[arg(long, conflicts_with = "user")]
        pending: bool,
        /// Only loans past their due date.
        #[arg(long, conflicts_with_all = ["user", "pending"])]
        overdue: bool,
    },
    /// Request a loan.
    Request {
        #[arg(long)]
        book: String,
        #[arg(long)]
        user: String,
    },
    /// Approve a pending loan.
    Approve { id: String },
    /// Reject a pending loan.
    Reject { id: String },
    /// Return a borrowed book.
    Return { id: String },
    /// Extend an active loan.
    Extend { id: String },
    /// Cancel an active loan.
    Cancel { id: String },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    telemetry::init(args.json_logs);
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(run(args.command))
}

#[expect(clippy::print_stdout, reason = "the CLI reports results on stdout")]
async fn run(command: Command) -> Result<()> {
    let settings = ClientSettings::load_from_iter([OsString::from("library-client")])
        .map_err(|error| eyre!("failed to load configuration: {error}"))?;
    let mut services =
        LibraryServices::from_settings(&settings).wrap_err("failed to wire services")?;

    match command {
        Command::Sync => {
            let report = services.sync().await;
            println!(
                "books={} users={} loans={}",
                report.books, report.users, report.loans
            );
        }
        Command::Books { search, category } => {
            let books = match (search, category) {
                (Some(query), _) => services.books.search_async(&query).await,
                (None, Some(category)) => {
                    services.books.get_all_async().await;
                    services.books.filter_by_category(&category)
                }
                (None, None) => services.books.get_all_async().await,
            };
            books.iter().for_each(print_book);
        }
        Command::Loans {
            user,
            pending,
            overdue,
        } => {
            let loans = if let Some(user) = user {
                services.loans.by_user_async(&EntityId::new(user)).await
            } else if pending {
                services.loans.pending().await
            } else if overdue {
                services.loans.get_all_async().await;
                services.loans.overdue_sync(Utc::now())
            } else {
                services.loans.get_all_async().await
            };
            loans.iter().for_each(print_loan);
        }
        Command::Request { book, user } => {
            let created = services
                .loans
                .request(&EntityId::new(book), &EntityId::new(user))
                .await?;
            print_loan(&created.value);
            println!("persisted={}", provenance_label(created.provenance));
        }
        Command::Approve { id } => transition(&mut services, id, Transition::Approve).await?,
        Command::Reject { id } => transition(&mut services, id, Transition::Reject).await?,
        Command::Return { id } => transition(&mut services, id, Transition::Return).await?,
        Command::Extend { id } => transition(&mut services, id, Transition::Extend).await?,
        Command::Cancel { id } => transition(&mut services, id, Transition::Cancel).await?,
    }
    Ok(())
}

#[expect(clippy::print_stdout, reason = "the CLI reports results on stdout")]
async fn transition<C>(
    services: &mut LibraryServices<C>,
    id: String,
    transition: Transition,
) -> Result<()>
where
    C: RemoteClient + ?Sized,
{
    let id = EntityId::new(id);
    let loans = &mut services.loans;
    let result: TransitionResult = match transition {
        Transition::Approve => loans.approve(&id).await,
        Transition::Reject => loans.reject(&id).await,
        Transition::Return => loans.return_book(&id).await,
        Transition::Extend => loans.extend(&id).await,
        Transition::Cancel => loans.cancel(&id).await,
    };
    match result? {
        Some(TransitionOutcome::Applied(outcome)) => {
            print_loan(&outcome.value);
            println!("persisted={}", provenance_label(outcome.provenance));
            Ok(())
        }
        Some(TransitionOutcome::Unchanged { loan, rejection }) => {
            print_loan(&loan);
            Err(rejection.into())
        }
        None => Err(eyre!("loan {id} not found")),
    }
}

#[expect(clippy::print_stdout, reason = "the CLI reports results on stdout")]
fn print_book(book: &Book) {
    println!(
        "{}\t{}\t{}\t{}\t{}",
        book.id,
        book.status.as_str(),
        book.category,
        book.title,
        book.author
    );
}

#[expect(clippy::print_stdout, reason = "the CLI reports results on stdout")]
fn print_loan(loan: &Loan) {
    let now = Utc::now();
    println!(
        "{}\tbook={}\tuser={}\t{}\t{}\tdue={}",
        loan.id,
        loan.book_id,
        loan.user_id,
        loan.status,
        loan.effective_status(now),
        loan.due_date.format("%Y-%m-%d")
    );
}

const fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Remote => "remote",
        Provenance::LocalOnly => "local-only",
    }
}
