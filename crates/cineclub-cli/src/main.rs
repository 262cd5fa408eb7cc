use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use cineclub_api::events::{Event, EventQuery, NewEvent};
use cineclub_api::forum::{ForumComment, ForumFilter};
use cineclub_api::movies::{Movie, WatchToggle};
use cineclub_api::users::{ImageKind, ProfilePatch, RegisterRequest, Shelf};
use cineclub_api::{ApiClient, ApiError, ChatPoller, Pager};
use cineclub_core::settings::{load_settings, save_settings};
use cineclub_core::SessionStore;

#[derive(Parser)]
#[command(name = "cineclub")]
#[command(about = "CLI client for the cineclub movie platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        email: String,
        password: String,
    },

    /// Create an account (log in separately afterwards)
    Register {
        email: String,
        username: String,
        password: String,
        /// Display name; defaults to the username
        #[arg(long)]
        name: Option<String>,
    },

    /// Drop the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// List the movie catalogue
    Movies {
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Fetch every page
        #[arg(long)]
        all: bool,
    },

    /// Show one movie
    Movie { id: Uuid },

    /// Toggle a watch action on a movie
    Act {
        id: Uuid,
        #[arg(value_enum)]
        action: ActionArg,
    },

    /// Rate a movie (0-10, requires it to be marked watched)
    Rate { id: Uuid, rating: f64 },

    /// AI-generated digest of a movie's forum comments
    Summarize { id: Uuid },

    /// List a movie's forum comments
    Forum {
        movie: Uuid,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(value_enum, long, default_value = "recent")]
        filter: FilterArg,
        /// Page through the replies of this comment instead
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Post a comment (or a reply, with --parent)
    Comment {
        movie: Uuid,
        text: String,
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Toggle a like on a comment
    LikeComment { comment: i64 },

    /// Report a comment
    ReportComment { comment: i64 },

    /// List communities you belong to
    Communities,

    /// Create a community
    CommunityCreate {
        name: String,
        description: String,
        #[arg(long)]
        private: bool,
    },

    /// Delete a community you own
    CommunityDelete { id: i64 },

    /// List a community's members
    Members { community: i64 },

    /// Add a member to a community
    AddMember { community: i64, username: String },

    /// List a community's chats
    Chats { community: i64 },

    /// Create a chat in a community
    ChatCreate { community: i64, name: String },

    /// Show a chat's messages; --follow keeps polling until Ctrl-C
    Chat {
        community: i64,
        chat: i64,
        #[arg(long)]
        follow: bool,
    },

    /// Send a chat message
    Say {
        community: i64,
        chat: i64,
        message: String,
    },

    /// List events
    Events {
        /// Restrict to one month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Events of a given user
        #[arg(long)]
        user: Option<String>,
        /// Only events you participate in
        #[arg(long)]
        participating: bool,
        /// Only events you own
        #[arg(long)]
        owned: bool,
    },

    /// Create an event
    EventCreate {
        title: String,
        /// Date and time, RFC 3339 (e.g. 2026-09-01T20:00:00Z)
        when: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },

    /// Join an event
    EventJoin { id: Uuid },

    /// Leave an event
    EventLeave { id: Uuid },

    /// Show a profile with its stats
    Profile {
        /// Defaults to your own
        username: Option<String>,
    },

    /// Update your display name or bio
    ProfileSet {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },

    /// Upload your avatar or banner (JPG or PNG)
    UploadImage {
        #[arg(value_enum)]
        kind: ImageArg,
        file: PathBuf,
    },

    /// Upload a community icon (JPG or PNG)
    UploadIcon { community: i64, file: PathBuf },

    /// Follow a user
    Follow { username: String },

    /// Unfollow a user
    Unfollow { username: String },

    /// List a user's followers
    Followers { username: String },

    /// List who a user follows
    Following { username: String },

    /// One shelf of a user's movies
    ShelfList {
        username: String,
        #[arg(value_enum)]
        shelf: ShelfArg,
    },

    /// A user's activity and event counters
    Stats {
        /// Defaults to your own
        username: Option<String>,
    },

    /// A user's forum comments across all movies
    Comments {
        username: String,
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Ask the AI movie assistant a question
    Ask { question: String },

    /// Show or change client settings
    Config {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        responder_base: Option<String>,
        #[arg(long)]
        poll_interval: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Like,
    Dislike,
    Favorite,
    WatchLater,
    Watched,
}

impl From<ActionArg> for WatchToggle {
    fn from(a: ActionArg) -> Self {
        match a {
            ActionArg::Like => WatchToggle::Like,
            ActionArg::Dislike => WatchToggle::Dislike,
            ActionArg::Favorite => WatchToggle::Favorite,
            ActionArg::WatchLater => WatchToggle::WatchLater,
            ActionArg::Watched => WatchToggle::Watched,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    Recent,
    Oldest,
    TopRated,
}

impl From<FilterArg> for ForumFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::Recent => ForumFilter::Recent,
            FilterArg::Oldest => ForumFilter::Oldest,
            FilterArg::TopRated => ForumFilter::TopRated,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ImageArg {
    Avatar,
    Banner,
}

impl From<ImageArg> for ImageKind {
    fn from(i: ImageArg) -> Self {
        match i {
            ImageArg::Avatar => ImageKind::Avatar,
            ImageArg::Banner => ImageKind::Banner,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShelfArg {
    Watched,
    Favorites,
    WatchLater,
}

impl From<ShelfArg> for Shelf {
    fn from(s: ShelfArg) -> Self {
        match s {
            ShelfArg::Watched => Shelf::Watched,
            ShelfArg::Favorites => Shelf::Favorites,
            ShelfArg::WatchLater => Shelf::WatchLater,
        }
    }
}

/// Turn an API failure into terminal output: inline field messages on
/// stderr, the toast line as the final error.
trait Friendly<T> {
    fn friendly(self) -> Result<T>;
}

impl<T> Friendly<T> for std::result::Result<T, ApiError> {
    fn friendly(self) -> Result<T> {
        self.map_err(|err| {
            for f in err.field_errors() {
                eprintln!("  {}: {}", f.field, f.message);
            }
            anyhow!(err.toast())
        })
    }
}

fn require_login(client: &ApiClient) -> Result<()> {
    if client.session().is_logged_in() {
        Ok(())
    } else {
        Err(anyhow!("not logged in; run `cineclub login` first"))
    }
}

fn own_username(client: &ApiClient) -> Result<String> {
    client
        .session()
        .username()
        .ok_or_else(|| anyhow!("no username stored; pass one explicitly"))
}

fn print_movie_line(m: &Movie) {
    let year = m
        .release_date
        .map(|d| format!(" ({})", d.format("%Y")))
        .unwrap_or_default();
    println!("{}  {}{}  ★ {:.1}", m.id, m.title, year, m.average_rating);
}

fn print_comment(c: &ForumComment, indent: usize) {
    let pad = "  ".repeat(indent);
    println!(
        "{pad}#{} {} ({} likes, {}): {}",
        c.id,
        c.user.username,
        c.likes_count,
        c.created_at.format("%Y-%m-%d %H:%M"),
        c.text
    );
    for reply in &c.replies {
        print_comment(reply, indent + 1);
    }
}

fn print_event(e: &Event) {
    let marker = if e.is_participating { "*" } else { " " };
    println!(
        "{marker} {}  {}  {} (by {}, {} going)",
        e.id,
        e.event_datetime.format("%Y-%m-%d %H:%M"),
        e.title,
        e.owner.username,
        e.participants.len()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings()?;
    let session = SessionStore::open()?;
    let client = ApiClient::new(settings.clone(), session)?;

    match cli.command {
        Commands::Login { email, password } => {
            client.login(&email, &password).await.friendly()?;
            println!(
                "logged in as {}",
                client.session().username().unwrap_or_else(|| email.clone())
            );
        }

        Commands::Register {
            email,
            username,
            password,
            name,
        } => {
            let req = RegisterRequest {
                email,
                name: name.unwrap_or_else(|| username.clone()),
                username,
                password: password.clone(),
                password2: password,
            };
            client.register(&req).await.friendly()?;
            println!("account created; log in with `cineclub login`");
        }

        Commands::Logout => {
            client.logout().friendly()?;
            println!("logged out");
        }

        Commands::Whoami => match client.session().username() {
            Some(username) => println!("{username}"),
            None if client.session().is_logged_in() => println!("(logged in, username unknown)"),
            None => println!("not logged in"),
        },

        Commands::Movies { page, all } => {
            require_login(&client)?;
            if all {
                let mut pager = Pager::new();
                while pager.has_more() {
                    let page = client.movies(pager.next_page()).await.friendly()?;
                    pager.absorb(page);
                }
                for m in &pager.items {
                    print_movie_line(m);
                }
            } else {
                let fetched = client.movies(page).await.friendly()?;
                for m in &fetched.results {
                    print_movie_line(m);
                }
                if fetched.next.is_some() {
                    println!("... more on page {}", page + 1);
                }
            }
        }

        Commands::Movie { id } => {
            require_login(&client)?;
            let movie = client.movie(id).await.friendly()?;
            let action = client.user_action(id).await.friendly()?;
            println!("{}", serde_json::to_string_pretty(&movie)?);
            println!("{}", serde_json::to_string_pretty(&action)?);
        }

        Commands::Act { id, action } => {
            require_login(&client)?;
            let current = client.user_action(id).await.friendly()?;
            let updated = client
                .toggle_action(id, action.into(), &current)
                .await
                .friendly()?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }

        Commands::Rate { id, rating } => {
            require_login(&client)?;
            let current = client.user_action(id).await.friendly()?;
            let summary = client.rate(id, rating, &current).await.friendly()?;
            println!(
                "your rating: {}  (average {:.1} over {} votes)",
                summary.your_rating, summary.average, summary.total_votes
            );
        }

        Commands::Summarize { id } => {
            require_login(&client)?;
            let summary = client.summarize_comments(id).await.friendly()?;
            println!("{summary}");
        }

        Commands::Forum {
            movie,
            page,
            filter,
            parent,
        } => {
            require_login(&client)?;
            let fetched = client
                .forum(movie, page, filter.into(), parent)
                .await
                .friendly()?;
            for comment in &fetched.results {
                print_comment(comment, 0);
            }
            if fetched.next.is_some() {
                println!("... more on page {}", page + 1);
            }
        }

        Commands::Comment {
            movie,
            text,
            parent,
        } => {
            require_login(&client)?;
            let action = client.user_action(movie).await.friendly()?;
            let posted = client
                .post_comment(movie, &text, parent, &action)
                .await
                .friendly()?;
            println!("posted comment #{}", posted.id);
        }

        Commands::LikeComment { comment } => {
            require_login(&client)?;
            let likes = client.like_comment(comment).await.friendly()?;
            println!("{likes} likes");
        }

        Commands::ReportComment { comment } => {
            require_login(&client)?;
            let detail = client.report_comment(comment).await.friendly()?;
            println!("{detail}");
        }

        Commands::Communities => {
            require_login(&client)?;
            for c in client.communities().await.friendly()? {
                let visibility = if c.is_public { "public" } else { "private" };
                println!(
                    "{}  {} ({visibility}, {} members): {}",
                    c.id,
                    c.name,
                    c.members.len(),
                    c.description
                );
            }
        }

        Commands::CommunityCreate {
            name,
            description,
            private,
        } => {
            require_login(&client)?;
            let community = client
                .create_community(&name, &description, !private)
                .await
                .friendly()?;
            println!("created community {}", community.id);
        }

        Commands::CommunityDelete { id } => {
            require_login(&client)?;
            client.delete_community(id).await.friendly()?;
            println!("deleted");
        }

        Commands::Members { community } => {
            require_login(&client)?;
            for member in client.members(community).await.friendly()? {
                println!("{}  {}", member.id, member.username);
            }
        }

        Commands::AddMember {
            community,
            username,
        } => {
            require_login(&client)?;
            client.add_member(community, &username).await.friendly()?;
            println!("added {username}");
        }

        Commands::Chats { community } => {
            require_login(&client)?;
            for chat in client.chats(community).await.friendly()? {
                println!("{}  {}", chat.id, chat.name);
            }
        }

        Commands::ChatCreate { community, name } => {
            require_login(&client)?;
            let chat = client.create_chat(community, &name).await.friendly()?;
            println!("created chat {}", chat.id);
        }

        Commands::Chat {
            community,
            chat,
            follow,
        } => {
            require_login(&client)?;
            if follow {
                follow_chat(client.clone(), community, chat, settings.poll_interval_secs).await?;
            } else {
                let messages = client.messages(community, chat).await.friendly()?;
                // Newest first on the wire; read top to bottom here.
                for m in messages.iter().rev() {
                    println!("[{}] {}: {}", m.sent_at.format("%H:%M"), m.username, m.content);
                }
            }
        }

        Commands::Say {
            community,
            chat,
            message,
        } => {
            require_login(&client)?;
            client.send_message(community, chat, &message).await.friendly()?;
            println!("sent");
        }

        Commands::Events {
            month,
            user,
            participating,
            owned,
        } => {
            require_login(&client)?;
            let query = EventQuery {
                month,
                user,
                participating,
                owned,
            };
            for event in client.events(&query).await.friendly()? {
                print_event(&event);
            }
        }

        Commands::EventCreate {
            title,
            when,
            description,
            location,
        } => {
            require_login(&client)?;
            let event_datetime = DateTime::parse_from_rfc3339(&when)
                .map_err(|e| anyhow!("invalid date {when:?}: {e}"))?
                .with_timezone(&Utc);
            let event = client
                .create_event(&NewEvent {
                    title,
                    description,
                    event_datetime,
                    location,
                    image: None,
                })
                .await
                .friendly()?;
            println!("created event {}", event.id);
        }

        Commands::EventJoin { id } => {
            require_login(&client)?;
            client.join_event(id).await.friendly()?;
            println!("joined");
        }

        Commands::EventLeave { id } => {
            require_login(&client)?;
            client.leave_event(id).await.friendly()?;
            println!("left");
        }

        Commands::Profile { username } => {
            require_login(&client)?;
            let username = match username {
                Some(u) => u,
                None => own_username(&client)?,
            };
            let user = client.user(&username).await.friendly()?;
            let stats = client.user_stats(&username).await.friendly()?;
            println!("{} ({})", user.username, user.name.as_deref().unwrap_or("-"));
            if let Some(bio) = &user.bio {
                println!("{bio}");
            }
            println!(
                "watched {}  likes {}  comments {}  followers {}  following {}",
                stats.watched, stats.likes, stats.comments, stats.followers, stats.following
            );
        }

        Commands::ProfileSet { name, bio } => {
            require_login(&client)?;
            if name.is_none() && bio.is_none() {
                return Err(anyhow!("nothing to change; pass --name or --bio"));
            }
            let username = own_username(&client)?;
            let updated = client
                .update_profile(&username, &ProfilePatch { name, bio })
                .await
                .friendly()?;
            println!("updated profile of {}", updated.username);
        }

        Commands::UploadImage { kind, file } => {
            require_login(&client)?;
            let username = own_username(&client)?;
            client
                .upload_image(&username, kind.into(), &file)
                .await
                .friendly()?;
            println!("uploaded");
        }

        Commands::UploadIcon { community, file } => {
            require_login(&client)?;
            client.upload_icon(community, &file).await.friendly()?;
            println!("uploaded");
        }

        Commands::Follow { username } => {
            require_login(&client)?;
            client.follow(&username).await.friendly()?;
            println!("following {username}");
        }

        Commands::Unfollow { username } => {
            require_login(&client)?;
            client.unfollow(&username).await.friendly()?;
            println!("unfollowed {username}");
        }

        Commands::Followers { username } => {
            require_login(&client)?;
            for entry in client.followers(&username).await.friendly()? {
                println!("{}", entry.user_username);
            }
        }

        Commands::Following { username } => {
            require_login(&client)?;
            for entry in client.following(&username).await.friendly()? {
                println!("{}", entry.following_username);
            }
        }

        Commands::ShelfList { username, shelf } => {
            require_login(&client)?;
            for movie in client.user_movies(&username, shelf.into()).await.friendly()? {
                print_movie_line(&movie);
            }
        }

        Commands::Stats { username } => {
            require_login(&client)?;
            let username = match username {
                Some(u) => u,
                None => own_username(&client)?,
            };
            let stats = client.user_stats(&username).await.friendly()?;
            let events = client.event_stats(&username).await.friendly()?;
            println!(
                "watched {}  likes {}  comments {}  followers {}  following {}",
                stats.watched, stats.likes, stats.comments, stats.followers, stats.following
            );
            println!(
                "events: {} total, {} owned, {} upcoming",
                events.total_events, events.owned_events, events.upcoming_events
            );
        }

        Commands::Comments { username, page } => {
            require_login(&client)?;
            let fetched = client.user_comments(&username, page).await.friendly()?;
            for comment in &fetched.results {
                let title = comment.movie_title.as_deref().unwrap_or("?");
                println!(
                    "#{} on {} ({}): {}",
                    comment.id,
                    title,
                    comment.created_at.format("%Y-%m-%d"),
                    comment.text
                );
            }
            if fetched.next.is_some() {
                println!("... more on page {}", page + 1);
            }
        }

        Commands::Ask { question } => {
            let answer = client.ask(&question).await.friendly()?;
            println!("{}", answer.answer);
        }

        Commands::Config {
            api_base,
            responder_base,
            poll_interval,
        } => {
            let mut settings = settings;
            if api_base.is_none() && responder_base.is_none() && poll_interval.is_none() {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                if let Some(url) = api_base {
                    settings.api_base_url = url;
                }
                if let Some(url) = responder_base {
                    settings.responder_base_url = url;
                }
                if let Some(secs) = poll_interval {
                    settings.poll_interval_secs = secs;
                }
                save_settings(&settings)?;
                println!("settings saved");
            }
        }
    }

    Ok(())
}

/// Live chat view: poll in the background, reprint on every new
/// snapshot, stop cleanly on Ctrl-C.
async fn follow_chat(client: ApiClient, community: i64, chat: i64, interval_secs: u64) -> Result<()> {
    let poller = ChatPoller::spawn(client, community, chat, Duration::from_secs(interval_secs));
    let mut rx = poller.subscribe();

    println!("following chat {chat} (Ctrl-C to stop)");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let messages = rx.borrow_and_update().clone();
                for m in messages.iter().rev() {
                    println!("[{}] {}: {}", m.sent_at.format("%H:%M"), m.username, m.content);
                }
                println!("----");
            }
        }
    }
    poller.stop();
    Ok(())
}
