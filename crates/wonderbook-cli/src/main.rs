use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wonderbook_client::{
    ApiError, BookInput, BookQuery, CatalogSource, CollectionQuery, CollectionSource, Session,
    WonderbookApi,
};
use wonderbook_core::pagination::page_count;
use wonderbook_core::{
    AppConfig, BookOrder, BookRecord, CombinationMode, CommentDraft, ExitCode, FilterAction,
    FilterSelection, FilterStore, ListStatus, PaginatedList, ReadFilter, ReadingPosition,
    YearBounds, YearFilter, YearMode, average_rating, filter_books, filter_collection, paginate,
    sort_books,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "wonderbook",
    about = "Browse the Wonderbook catalog and your collection from the terminal",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting WONDERBOOK_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog books matching the filters.
    Books {
        #[command(flatten)]
        filters: FilterArgs,
        /// server, last-added, best-rated or title.
        #[arg(long, default_value = "server")]
        order: String,
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Operations on a single book.
    Book {
        #[command(subcommand)]
        action: BookAction,
    },

    /// List all categories.
    Categories,

    /// Your personal collection.
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Comments and ratings.
    Comments {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Saved reading positions.
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },

    /// Stored API token.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Category to filter by (at most two; extra ones are ignored).
    #[arg(long = "category", action = clap::ArgAction::Append)]
    categories: Vec<String>,
    /// How several categories combine: et (all) or ou (any).
    #[arg(long)]
    mode: Option<CombinationMode>,
    /// Exact publication year, or a range written `2018-2022`.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    year: Option<String>,
    /// Start of a year range (with --to).
    #[arg(long, requires = "to")]
    from: Option<String>,
    /// End of a year range (with --from).
    #[arg(long, requires = "from")]
    to: Option<String>,
    /// Case-insensitive text matched against title and author.
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum BookAction {
    /// Get a book by ID.
    Get { id: i64 },
    /// Get a book by exact title.
    Title { title: String },
    /// Add a book to the catalog (admin).
    Create {
        #[command(flatten)]
        fields: BookFields,
    },
    /// Replace a catalog entry (admin).
    Update {
        id: i64,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Delete a book (admin).
    Delete {
        id: i64,
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Args)]
struct BookFields {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    /// Publication date, e.g. 1965-08-01.
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    genre: Option<String>,
    #[arg(long = "category", action = clap::ArgAction::Append)]
    categories: Vec<String>,
    #[arg(long = "editor", action = clap::ArgAction::Append)]
    editors: Vec<String>,
    #[arg(long, default_value = "")]
    summary: String,
    #[arg(long, default_value = "")]
    cover_url: String,
    #[arg(long)]
    ebook_url: Option<String>,
}

impl From<BookFields> for BookInput {
    fn from(f: BookFields) -> Self {
        Self {
            title: f.title,
            author: f.author,
            date: f.date,
            genre: f.genre,
            categories: f.categories,
            editors: f.editors,
            summary: f.summary,
            cover_url: f.cover_url,
            ebook_url: f.ebook_url,
        }
    }
}

#[derive(Subcommand)]
enum CollectionAction {
    /// List collection items matching the filters.
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// all, read or unread.
        #[arg(long, default_value = "all")]
        read: ReadFilter,
        /// Only books you commented on.
        #[arg(long)]
        commented: bool,
        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// Add a book to your collection.
    Add { book_id: i64 },
    /// Remove a book from your collection.
    Remove { book_id: i64 },
    /// Mark a collected book as read.
    MarkRead { book_id: i64 },
}

#[derive(Subcommand)]
enum CommentAction {
    /// List comments on a book.
    List { book_id: i64 },
    /// Post (or replace) your comment on a book.
    Post {
        book_id: i64,
        content: String,
        #[arg(long, default_value = "0")]
        rating: u8,
    },
    /// Delete a comment.
    Delete {
        comment_id: i64,
        /// Delete someone else's comment as a moderator.
        #[arg(long)]
        admin: bool,
    },
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Show the saved position for a book.
    Get { book_id: i64 },
    /// Save a position token for a book.
    Set { book_id: i64, position: String },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show who the CLI acts as.
    Show,
    /// Store a token issued by the Wonderbook auth service.
    Set {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user: i64,
    },
    /// Forget the stored token.
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Print the config file path.
    Path,
    /// Write the default config if none exists.
    Init,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("WONDERBOOK_JSON").as_deref() == Ok("1");

    let config = AppConfig::load()?;
    init_tracing(&config.logging.level);

    let session_path = config.session_path();
    let session = Session::load_from(&session_path)?;
    let out = Output {
        json: json_output,
        start,
    };

    match cli.command {
        Commands::Books {
            filters,
            order,
            page,
        } => {
            let order: BookOrder = order.parse()?;
            let store = build_store(&config, &filters, None);
            let selection = store.selection();
            let api = Arc::new(WonderbookApi::with_session(&config.api, session.as_ref())?);
            let list =
                PaginatedList::with_page_size(CatalogSource::new(api), config.catalog.page_size);

            let status = list.reload(&BookQuery::from_selection(selection)).await;
            if status == ListStatus::Errored {
                out.fail_list(list.error().unwrap_or_default());
            }

            // The server may ignore some filters; apply them again locally.
            let mut visible = filter_books(&list.items(), selection);
            sort_books(&mut visible, order);
            let items = paginate(&visible, page, list.page_size());
            let pages = page_count(visible.len(), list.page_size());

            if out.json {
                out.json_ok(serde_json::json!({
                    "items": items,
                    "total": visible.len(),
                    "page": page,
                    "pages": pages,
                    "filters": selection,
                }))?;
            } else if items.is_empty() {
                println!("No books match.");
            } else {
                items.iter().for_each(print_book_line);
                println!("-- page {page}/{pages} ({} books)", visible.len());
            }
        }

        Commands::Book { action } => {
            let api = WonderbookApi::with_session(&config.api, session.as_ref())?;
            match action {
                BookAction::Get { id } => {
                    let book = out.api_result(api.book(id).await);
                    out.show(&book, || print_book_details(&book))?;
                }
                BookAction::Title { title } => {
                    let book = out.api_result(api.book_by_title(&title).await);
                    out.show(&book, || print_book_details(&book))?;
                }
                BookAction::Create { fields } => {
                    let book = out.api_result(api.create_book(&fields.into()).await);
                    out.show(&book, || {
                        println!("Created book {}: {}", book.id, book.title)
                    })?;
                }
                BookAction::Update { id, fields } => {
                    let book = out.api_result(api.update_book(id, &fields.into()).await);
                    out.show(&book, || {
                        println!("Updated book {}: {}", book.id, book.title)
                    })?;
                }
                BookAction::Delete { id, confirm } => {
                    if !confirm {
                        eprintln!("Add --confirm to delete without prompt.");
                        std::process::exit(ExitCode::ConfirmRequired as i32);
                    }
                    out.api_result(api.delete_book(id).await);
                    out.show(&serde_json::json!({ "deleted": id }), || {
                        println!("Deleted book: {id}")
                    })?;
                }
            }
        }

        Commands::Categories => {
            let api = WonderbookApi::with_session(&config.api, session.as_ref())?;
            let categories = out.api_result(api.categories().await);
            out.show(&categories, || {
                for category in &categories {
                    println!("{}", category.name);
                }
            })?;
        }

        Commands::Collection { action } => {
            let api = Arc::new(WonderbookApi::with_session(&config.api, session.as_ref())?);
            match action {
                CollectionAction::List {
                    filters,
                    read,
                    commented,
                    page,
                } => {
                    let store = build_store(&config, &filters, Some((read, commented)));
                    let selection = store.selection();
                    let list = PaginatedList::with_page_size(
                        CollectionSource::new(Arc::clone(&api)),
                        config.catalog.page_size,
                    );

                    let status = list.reload(&CollectionQuery::from_selection(selection)).await;
                    if status == ListStatus::Errored {
                        out.fail_list(list.error().unwrap_or_default());
                    }

                    let visible = filter_collection(&list.items(), selection);
                    let items = paginate(&visible, page, list.page_size());

                    if out.json {
                        out.json_ok(serde_json::json!({
                            "items": items,
                            "total": visible.len(),
                            "page": page,
                            "filters": selection,
                        }))?;
                    } else if items.is_empty() {
                        println!("Nothing in your collection matches.");
                    } else {
                        for item in items {
                            let mark = if item.is_read { "✓" } else { " " };
                            if let Some(book) = &item.book {
                                print!("[{mark}] ");
                                print_book_line(book);
                            }
                        }
                        println!("-- {} of {} items", items.len(), visible.len());
                    }
                }
                CollectionAction::Add { book_id } => {
                    out.api_result(api.add_to_collection(book_id).await);
                    out.show(&serde_json::json!({ "added": book_id }), || {
                        println!("Added book {book_id} to your collection.")
                    })?;
                }
                CollectionAction::Remove { book_id } => {
                    out.api_result(api.remove_from_collection(book_id).await);
                    out.show(&serde_json::json!({ "removed": book_id }), || {
                        println!("Removed book {book_id} from your collection.")
                    })?;
                }
                CollectionAction::MarkRead { book_id } => {
                    out.api_result(api.mark_read(book_id).await);
                    out.show(&serde_json::json!({ "read": book_id }), || {
                        println!("Marked book {book_id} as read.")
                    })?;
                }
            }
        }

        Commands::Comments { action } => {
            let api = WonderbookApi::with_session(&config.api, session.as_ref())?;
            match action {
                CommentAction::List { book_id } => {
                    let comments = out.api_result(api.comments_for(book_id).await);
                    out.show(&comments, || {
                        let Some(avg) = average_rating(&comments) else {
                            println!("No comments.");
                            return;
                        };
                        for c in &comments {
                            let who = c.user.as_ref().map_or("?", |u| u.name.as_str());
                            println!("#{} {who} ({}/5): {}", c.id, c.rating, c.content);
                        }
                        println!("-- {} comments, average {avg:.1}/5", comments.len());
                    })?;
                }
                CommentAction::Post {
                    book_id,
                    content,
                    rating,
                } => {
                    let draft = CommentDraft::new(book_id, content, rating);
                    let comment = out.api_result(api.submit_comment(&draft).await);
                    out.show(&comment, || println!("Saved comment #{}.", comment.id))?;
                }
                CommentAction::Delete { comment_id, admin } => {
                    let result = if admin {
                        api.admin_delete_comment(comment_id).await
                    } else {
                        api.delete_comment(comment_id).await
                    };
                    out.api_result(result);
                    out.show(&serde_json::json!({ "deleted": comment_id }), || {
                        println!("Deleted comment #{comment_id}.")
                    })?;
                }
            }
        }

        Commands::Progress { action } => {
            let api = WonderbookApi::with_session(&config.api, session.as_ref())?;
            match action {
                ProgressAction::Get { book_id } => {
                    let position = out.api_result(api.reading_position(book_id).await);
                    out.show(&serde_json::json!({ "position": position }), || {
                        match &position {
                            Some(p) => println!("{p}"),
                            None => println!("No saved position."),
                        }
                    })?;
                }
                ProgressAction::Set { book_id, position } => {
                    let position = ReadingPosition(position);
                    out.api_result(api.save_reading_position(book_id, &position).await);
                    out.show(&serde_json::json!({ "position": position }), || {
                        println!("Saved position for book {book_id}.")
                    })?;
                }
            }
        }

        Commands::Session { action } => match action {
            SessionAction::Show => {
                let auth = Session::auth_state(session.as_ref());
                out.show(&auth, || match auth.user_id {
                    Some(id) => println!("Signed in as user {id}."),
                    None => println!("Not signed in."),
                })?;
            }
            SessionAction::Set { token, user } => {
                let session = Session::new(token, user)?;
                session.save_to(&session_path)?;
                out.show(&Session::auth_state(Some(&session)), || {
                    println!("Session saved for user {user}.")
                })?;
            }
            SessionAction::Clear => {
                let existed = Session::clear(&session_path)?;
                out.show(&serde_json::json!({ "cleared": existed }), || {
                    if existed {
                        println!("Session cleared.");
                    } else {
                        println!("No session stored.");
                    }
                })?;
            }
        },

        Commands::Config { action } => match action {
            ConfigAction::List => {
                out.show(&config, || match toml::to_string_pretty(&config) {
                    Ok(s) => print!("{s}"),
                    Err(e) => eprintln!("Cannot render config: {e}"),
                })?;
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                out.show(&serde_json::json!({ "path": path }), || {
                    println!("{}", path.display())
                })?;
            }
            ConfigAction::Init => {
                let path = AppConfig::config_path();
                let created = !path.exists();
                if created {
                    AppConfig::default().save_to(&path)?;
                }
                out.show(&serde_json::json!({ "path": path, "created": created }), || {
                    if created {
                        println!("Wrote {}", path.display());
                    } else {
                        println!("Config already exists at {}", path.display());
                    }
                })?;
            }
        },
    }

    Ok(())
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Runs the flags through the same actions the interactive controls use, so
/// the category cap and year validation apply here too.
fn build_store(
    config: &AppConfig,
    args: &FilterArgs,
    collection: Option<(ReadFilter, bool)>,
) -> FilterStore {
    let mut store = FilterStore::new(
        FilterSelection::with_mode(config.catalog.default_mode),
        YearBounds::up_to_current(config.catalog.min_year),
    );
    store.dispatch_batch(filter_actions(args, collection));

    let selection = store.selection();
    if selection.categories.len() < args.categories.len() {
        warn!(
            kept = ?selection.categories,
            "only two categories can be combined; ignoring the rest"
        );
    }
    let year_typed = args.year.is_some() || args.from.is_some();
    if year_typed && selection.year == YearFilter::Unset {
        warn!("year filter is not a valid year or range; ignoring it");
    }
    store
}

fn filter_actions(args: &FilterArgs, collection: Option<(ReadFilter, bool)>) -> Vec<FilterAction> {
    let mut actions: Vec<FilterAction> = args
        .categories
        .iter()
        .map(|c| FilterAction::ToggleCategory(c.clone()))
        .collect();
    if let Some(mode) = args.mode {
        actions.push(FilterAction::SetMode(mode));
    }
    if let Some(year) = &args.year {
        match YearFilter::parse(year) {
            YearFilter::Range(start, end) => actions.extend(range_actions(start, end)),
            _ => actions.push(FilterAction::TypeYear(year.clone())),
        }
    }
    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        actions.extend(range_actions(from, to));
    }
    if let Some(search) = &args.search {
        actions.push(FilterAction::SetSearch(search.clone()));
    }
    if let Some((read, commented)) = collection {
        actions.push(FilterAction::SetReadFilter(read));
        actions.push(FilterAction::SetCommented(commented));
    }
    actions
}

fn range_actions(start: impl ToString, end: impl ToString) -> [FilterAction; 3] {
    [
        FilterAction::SetYearMode(YearMode::Tranche),
        FilterAction::TypeRangeStart(start.to_string()),
        FilterAction::TypeRangeEnd(end.to_string()),
    ]
}

// ─── Output ──────────────────────────────────────────────────────────────────

struct Output {
    json: bool,
    start: Instant,
}

impl Output {
    fn duration_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    fn json_ok(&self, data: serde_json::Value) -> Result<()> {
        print_json(&serde_json::json!({
            "status": "ok",
            "data": data,
            "meta": { "duration_ms": self.duration_ms() }
        }))
    }

    /// JSON envelope or the human rendering.
    fn show<T: serde::Serialize + ?Sized>(&self, data: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            self.json_ok(serde_json::to_value(data)?)
        } else {
            human();
            Ok(())
        }
    }

    fn fail(&self, kind: &str, message: String, code: ExitCode) -> ! {
        if self.json {
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "error": kind,
                "message": message,
                "meta": { "duration_ms": self.duration_ms() }
            }));
        } else {
            eprintln!("{message}");
        }
        std::process::exit(code as i32);
    }

    fn fail_list(&self, message: String) -> ! {
        let message = format!("Could not load the list: {message}");
        self.fail("network", message, ExitCode::NetworkError)
    }

    /// Unwraps an API call or exits with a matching code.
    fn api_result<T>(&self, result: wonderbook_client::Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(ApiError::NotFound(what)) => {
                self.fail("not_found", format!("Not found: {what}"), ExitCode::NotFound)
            }
            Err(ApiError::Unauthorized(what)) => self.fail(
                "unauthorized",
                format!("Not allowed: {what}. Store a token with `wonderbook session set`."),
                ExitCode::GeneralError,
            ),
            Err(e @ ApiError::Core(_)) => {
                self.fail("invalid", e.to_string(), ExitCode::InvalidArgs)
            }
            Err(e) => self.fail("network", e.to_string(), ExitCode::NetworkError),
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_book_line(book: &BookRecord) {
    let year = book
        .publication_year()
        .map(|y| y.to_string())
        .unwrap_or_default();
    println!(
        "{id:>5}  {title:<40}  {author:<25}  {year:<4}  {rating:.1}★",
        id = book.id,
        title = book.title,
        author = book.author,
        rating = book.average_rating,
    );
}

fn print_book_details(book: &BookRecord) {
    println!("{} by {}", book.title, book.author);
    if let Some(date) = &book.date {
        println!("Published: {date}");
    }
    if !book.categories.is_empty() {
        let names: Vec<&str> = book.category_names().collect();
        println!("Categories: {}", names.join(", "));
    }
    if !book.editors.is_empty() {
        let names: Vec<&str> = book.editors.iter().map(|e| e.name.as_str()).collect();
        println!("Editors: {}", names.join(", "));
    }
    println!(
        "Rating: {:.1}/5 ({} comments)",
        book.average_rating,
        book.comments.len()
    );
    if book.has_ebook() {
        println!("E-book available");
    }
    if !book.summary.is_empty() {
        println!("\n{}", book.summary);
    }
}

fn init_tracing(level: &str) {
    let filter =
        EnvFilter::try_from_env("WONDERBOOK_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.catalog.min_year = 1000;
        config
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_books_filters() {
        let cli = Cli::try_parse_from([
            "wonderbook",
            "books",
            "--category",
            "Fiction",
            "--category",
            "Drama",
            "--mode",
            "ou",
            "--from",
            "2018",
            "--to",
            "2022",
            "--search",
            "tolkien",
            "--page",
            "2",
        ])
        .unwrap();
        let Commands::Books { filters, page, .. } = cli.command else {
            panic!("expected books command");
        };
        assert_eq!(page, 2);
        assert_eq!(filters.mode, Some(CombinationMode::Or));

        let store = build_store(&config(), &filters, None);
        let selection = store.selection();
        assert_eq!(selection.categories, vec!["Fiction", "Drama"]);
        assert_eq!(selection.year, YearFilter::Range(2018, 2022));
        assert_eq!(selection.search, "tolkien");
    }

    #[test]
    fn year_flag_accepts_a_range() {
        let args = FilterArgs {
            year: Some("2018-2022".into()),
            ..Default::default()
        };
        let store = build_store(&config(), &args, None);
        assert_eq!(store.selection().year, YearFilter::Range(2018, 2022));

        let args = FilterArgs {
            year: Some("1965".into()),
            ..Default::default()
        };
        let store = build_store(&config(), &args, None);
        assert_eq!(store.selection().year, YearFilter::Year(1965));
    }

    #[test]
    fn year_and_range_conflict() {
        let args = [
            "wonderbook",
            "books",
            "--year",
            "2020",
            "--from",
            "2018",
            "--to",
            "2019",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn category_cap_and_bad_year_in_store() {
        let args = FilterArgs {
            categories: vec!["A".into(), "B".into(), "C".into()],
            year: Some("20x2".into()),
            ..Default::default()
        };
        let store = build_store(&config(), &args, Some((ReadFilter::Unread, true)));
        let selection = store.selection();
        assert_eq!(selection.categories, vec!["A", "B"]);
        assert_eq!(selection.year, YearFilter::Unset);
        assert_eq!(selection.read, ReadFilter::Unread);
        assert!(selection.commented);
    }

    #[test]
    fn book_fields_become_input() {
        let cli = Cli::try_parse_from([
            "wonderbook",
            "book",
            "update",
            "4",
            "--title",
            "Dune",
            "--author",
            "Frank Herbert",
            "--category",
            "SF",
            "--editor",
            "Chilton",
        ])
        .unwrap();
        let Commands::Book {
            action: BookAction::Update { id, fields },
        } = cli.command
        else {
            panic!("expected book update");
        };
        let input = BookInput::from(fields);
        assert_eq!(id, 4);
        assert_eq!(input.title, "Dune");
        assert_eq!(input.categories, vec!["SF"]);
        assert_eq!(input.editors, vec!["Chilton"]);
        assert_eq!(input.date, None);
    }
}
