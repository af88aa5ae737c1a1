use crate::comments::{CommentService, CommentThread};
use crate::config::CasagramConfig;
use crate::error::ClientError;
use crate::feed::{FeedAggregator, FeedState};
use crate::likes::{LikeCoordinator, ToggleOutcome};
use crate::listings::{ImageUpload, ListingService, OwnerSort};
use crate::models::{FilterCriteria, PropertyDraft};
use crate::platform::{Platform, ProfileChanges, SignupInput};
use crate::profile::ProfileService;
use crate::realtime::{Reconciler, ReconcilerHandle};
use crate::session::{SessionResolver, SessionState};
use anyhow::Result;
use shell_words;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run the interactive CLI used for browsing the feed, posting listings,
/// and managing the signed-in profile.
pub async fn run_cli(config: CasagramConfig, platform: Arc<dyn Platform>) -> Result<()> {
    let mut session = CliSession {
        input: BufReader::new(tokio::io::stdin()),
        resolver: SessionResolver::new(platform.clone()),
        feed: FeedAggregator::new(platform.clone(), config.feed_page_size),
        likes: LikeCoordinator::new(platform.clone()),
        comments: CommentService::new(platform.clone()),
        listings: ListingService::new(platform.clone(), config.max_upload_bytes),
        profiles: ProfileService::new(platform.clone()),
        reconciler: Reconciler::new(
            platform,
            Duration::from_millis(config.realtime_debounce_ms),
        ),
        filter: FilterCriteria::default(),
        current_feed: None,
        watched: None,
    };

    session.resolver.resolve().await;
    println!("Casagram CLI ready. Type 'help' for a list of commands.");
    session.print_identity();

    loop {
        print!("casagram> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = session.input.read_line(&mut line).await?;
        if read == 0 {
            println!("Exiting");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => continue,
            Err(err) => {
                println!("Unable to parse command: {err}");
                continue;
            }
        };

        match session.handle_command(&tokens).await {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Exit) => break,
            Err(err) => {
                println!("Error: {err:#}");
            }
        }
    }

    Ok(())
}

struct CliSession {
    input: BufReader<tokio::io::Stdin>,
    resolver: SessionResolver,
    feed: FeedAggregator,
    likes: LikeCoordinator,
    comments: CommentService,
    listings: ListingService,
    profiles: ProfileService,
    reconciler: Reconciler,
    filter: FilterCriteria,
    current_feed: Option<FeedState>,
    watched: Option<(Arc<Mutex<CommentThread>>, ReconcilerHandle)>,
}

enum LoopAction {
    Continue,
    Exit,
}

impl CliSession {
    async fn handle_command(&mut self, tokens: &[String]) -> Result<LoopAction> {
        let command = tokens[0].as_str();
        match command {
            "help" => {
                self.print_help();
                Ok(LoopAction::Continue)
            }
            "signup" => {
                if tokens.len() < 3 {
                    println!("Usage: signup <email> <password> [\"full name\"]");
                    return Ok(LoopAction::Continue);
                }
                let input = SignupInput {
                    email: tokens[1].clone(),
                    password: tokens[2].clone(),
                    full_name: tokens.get(3).cloned(),
                    username: None,
                };
                match self.resolver.sign_up(input).await {
                    Ok(info) => println!("Signed up as {} ({})", info.email, info.user_id),
                    Err(err) => println!("Sign up failed: {err}"),
                }
                Ok(LoopAction::Continue)
            }
            "login" => {
                if tokens.len() < 3 {
                    println!("Usage: login <email> <password>");
                    return Ok(LoopAction::Continue);
                }
                match self.resolver.sign_in(&tokens[1], &tokens[2]).await {
                    Ok(info) => println!("Welcome back, {}", info.email),
                    Err(ClientError::Unauthenticated) => println!("Invalid credentials"),
                    Err(err) => println!("Login failed: {err}"),
                }
                Ok(LoopAction::Continue)
            }
            "logout" => {
                self.resolver.sign_out().await?;
                println!("Signed out");
                Ok(LoopAction::Continue)
            }
            "whoami" => {
                self.print_identity();
                Ok(LoopAction::Continue)
            }
            "feed" => {
                self.filter = parse_filter(&tokens[1..])?;
                let user = self.resolver.current();
                let state = self.feed.load_first(&self.filter, user.user_id()).await?;
                self.print_feed(&state);
                self.current_feed = Some(state);
                Ok(LoopAction::Continue)
            }
            "next" => {
                let cursor = self
                    .current_feed
                    .as_ref()
                    .and_then(|state| state.next_page.clone());
                match cursor {
                    Some(cursor) => {
                        let user = self.resolver.current();
                        let state = self
                            .feed
                            .load_after(&self.filter, cursor, user.user_id())
                            .await?;
                        self.print_feed(&state);
                        self.current_feed = Some(state);
                    }
                    None => println!("No more pages. Run 'feed' to start over."),
                }
                Ok(LoopAction::Continue)
            }
            "like" => {
                if tokens.len() < 2 {
                    println!("Usage: like <property_id>");
                    return Ok(LoopAction::Continue);
                }
                let Some(state) = self.current_feed.as_mut() else {
                    println!("Load the feed first with 'feed'.");
                    return Ok(LoopAction::Continue);
                };
                match self.likes.toggle(state, &tokens[1]).await? {
                    ToggleOutcome::Applied { liked, like_count } => {
                        let verb = if liked { "Liked" } else { "Unliked" };
                        println!("{verb} {} ({} likes)", tokens[1], like_count);
                    }
                    ToggleOutcome::InFlight => {
                        println!("A like for that listing is still in flight.");
                    }
                }
                Ok(LoopAction::Continue)
            }
            "post" => {
                if tokens.len() < 3 {
                    println!("Usage: post \"title\" <price> [key=value ...] [--image <path> ...]");
                    return Ok(LoopAction::Continue);
                }
                self.create_listing(&tokens[1..]).await?;
                Ok(LoopAction::Continue)
            }
            "myposts" => {
                let order = match tokens.get(1).map(String::as_str) {
                    Some("oldest") => OwnerSort::OldestFirst,
                    Some("cheap") => OwnerSort::PriceLowHigh,
                    Some("pricey") => OwnerSort::PriceHighLow,
                    _ => OwnerSort::NewestFirst,
                };
                let rent = tokens.iter().skip(1).find_map(|t| match t.as_str() {
                    "rent" => Some(true),
                    "sale" => Some(false),
                    _ => None,
                });
                let listings = self
                    .listings
                    .load_for_owner(&self.resolver.current(), order, rent)
                    .await?;
                if listings.posts.is_empty() {
                    println!("No listings yet. Use 'post' to create one.");
                } else {
                    for post in &listings.posts {
                        println!(
                            "  [{}] {} - {} {} ({})",
                            post.id,
                            post.title,
                            post.price,
                            post.currency,
                            if post.is_for_rent { "rent" } else { "sale" },
                        );
                    }
                }
                Ok(LoopAction::Continue)
            }
            "delete" => {
                if tokens.len() < 2 {
                    println!("Usage: delete <property_id>");
                    return Ok(LoopAction::Continue);
                }
                if !self
                    .confirm(&format!("Delete listing {}?", tokens[1]))
                    .await?
                {
                    println!("Kept {}", tokens[1]);
                    return Ok(LoopAction::Continue);
                }
                self.listings
                    .delete(&self.resolver.current(), &tokens[1])
                    .await?;
                println!("Deleted {}", tokens[1]);
                Ok(LoopAction::Continue)
            }
            "comments" => {
                if tokens.len() < 2 {
                    println!("Usage: comments <property_id>");
                    return Ok(LoopAction::Continue);
                }
                let thread = self.comments.load(&tokens[1]).await?;
                self.print_thread(&thread);
                Ok(LoopAction::Continue)
            }
            "comment" => {
                if tokens.len() < 3 {
                    println!("Usage: comment <property_id> \"message\"");
                    return Ok(LoopAction::Continue);
                }
                let mut thread = self.comments.load(&tokens[1]).await?;
                let content = tokens[2..].join(" ");
                let view = self
                    .comments
                    .add(&mut thread, &self.resolver.current(), &content)
                    .await?;
                println!("Commented {}", view.id);
                Ok(LoopAction::Continue)
            }
            "delcomment" => {
                if tokens.len() < 3 {
                    println!("Usage: delcomment <property_id> <comment_id>");
                    return Ok(LoopAction::Continue);
                }
                if !self
                    .confirm(&format!("Delete comment {}?", tokens[2]))
                    .await?
                {
                    println!("Kept comment {}", tokens[2]);
                    return Ok(LoopAction::Continue);
                }
                let mut thread = self.comments.load(&tokens[1]).await?;
                self.comments
                    .delete(&mut thread, &self.resolver.current(), &tokens[2])
                    .await?;
                println!("Deleted comment {}", tokens[2]);
                Ok(LoopAction::Continue)
            }
            "profile" => {
                let user_id = match tokens.get(1) {
                    Some(id) => id.clone(),
                    None => match self.resolver.current() {
                        SessionState::Authenticated(info) => info.user_id,
                        SessionState::Anonymous => {
                            println!("Usage: profile <user_id> (or sign in first)");
                            return Ok(LoopAction::Continue);
                        }
                    },
                };
                let profile = self.profiles.get(&user_id).await?;
                println!("{}", serde_json::to_string_pretty(&profile)?);
                Ok(LoopAction::Continue)
            }
            "setname" => {
                if tokens.len() < 2 {
                    println!("Usage: setname \"full name\"");
                    return Ok(LoopAction::Continue);
                }
                let changes = ProfileChanges {
                    full_name: Some(tokens[1..].join(" ")),
                    ..ProfileChanges::default()
                };
                let profile = self
                    .profiles
                    .update(&self.resolver.current(), &changes)
                    .await?;
                println!("Updated name to {:?}", profile.full_name);
                Ok(LoopAction::Continue)
            }
            "setbio" => {
                if tokens.len() < 2 {
                    println!("Usage: setbio \"text\"");
                    return Ok(LoopAction::Continue);
                }
                let changes = ProfileChanges {
                    bio: Some(tokens[1..].join(" ")),
                    ..ProfileChanges::default()
                };
                self.profiles
                    .update(&self.resolver.current(), &changes)
                    .await?;
                println!("Bio updated");
                Ok(LoopAction::Continue)
            }
            "watch" => {
                if tokens.len() < 2 {
                    println!("Usage: watch <property_id>");
                    return Ok(LoopAction::Continue);
                }
                let thread = Arc::new(Mutex::new(self.comments.load(&tokens[1]).await?));
                let handle = self.reconciler.watch_comments(&thread);
                self.watched = Some((thread, handle));
                println!("Watching comments on {}. Use 'watched' to view.", tokens[1]);
                Ok(LoopAction::Continue)
            }
            "watched" => {
                match &self.watched {
                    Some((thread, _)) => {
                        let snapshot = thread
                            .lock()
                            .map_err(|_| anyhow::anyhow!("watched thread lock poisoned"))?
                            .clone();
                        self.print_thread(&snapshot);
                    }
                    None => println!("Nothing is being watched. Use 'watch <property_id>'."),
                }
                Ok(LoopAction::Continue)
            }
            "unwatch" => {
                if self.watched.take().is_some() {
                    println!("Stopped watching.");
                } else {
                    println!("Nothing was being watched.");
                }
                Ok(LoopAction::Continue)
            }
            "quit" | "exit" => Ok(LoopAction::Exit),
            "clear" => {
                print!("\x1B[2J\x1B[1;1H");
                Ok(LoopAction::Continue)
            }
            other => {
                println!("Unknown command '{other}'. Type 'help' for a list of commands.");
                Ok(LoopAction::Continue)
            }
        }
    }

    fn print_help(&self) {
        println!("Available commands:");
        println!("  help                      Show this help message");
        println!("  signup EMAIL PW [NAME]    Create an account and sign in");
        println!("  login EMAIL PW            Sign in");
        println!("  logout                    Sign out");
        println!("  whoami                    Print the current identity");
        println!("  feed [key=value ...]      Load the feed; filters: location, min_price,");
        println!("                            max_price, bedrooms, bathrooms, rent, min_sqft,");
        println!("                            max_sqft, days, currency");
        println!("  next                      Load the next feed page");
        println!("  like <property_id>        Toggle your like on a loaded listing");
        println!("  post TITLE PRICE [k=v] [--image PATH]  Create a listing");
        println!("  myposts [oldest|cheap|pricey] [rent|sale]  List your own listings");
        println!("  delete <property_id>      Delete one of your listings (asks first)");
        println!("  comments <property_id>    Show a listing's comment thread");
        println!("  comment <id> MSG          Comment on a listing");
        println!("  delcomment <pid> <cid>    Delete one of your comments");
        println!("  watch <property_id>       Follow a thread's comments live");
        println!("  watched                   Show the watched thread");
        println!("  unwatch                   Stop following");
        println!("  profile [user_id]         Show a profile");
        println!("  setname NAME              Update your display name");
        println!("  setbio TEXT               Update your bio");
        println!("  clear                     Clear the screen");
        println!("  exit                      Quit the CLI");
    }

    /// Asks before a destructive command; anything other than an explicit
    /// yes declines.
    async fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{prompt} [y/N] ");
        io::stdout().flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line).await?;
        Ok(is_affirmative(&line))
    }

    fn print_identity(&self) {
        match self.resolver.current() {
            SessionState::Authenticated(info) => {
                println!("Signed in as {} ({})", info.email, info.user_id);
            }
            SessionState::Anonymous => println!("Browsing anonymously."),
        }
    }

    fn print_feed(&self, state: &FeedState) {
        if state.items.is_empty() {
            println!("No listings match. Try loosening the filters.");
            return;
        }
        for item in &state.items {
            let heart = if item.liked_by_me { "<3" } else { "  " };
            let location = item.property.location.as_deref().unwrap_or("unknown");
            println!(
                "  [{}] {} - {} {} in {} | {} likes {}",
                item.property.id,
                item.property.title,
                item.property.price,
                item.property.currency,
                location,
                item.like_count,
                heart,
            );
            if let Some(image) = item.property.primary_image() {
                println!("        {}", image.image_url);
            }
        }
        if state.next_page.is_some() {
            println!("(more available; run 'next')");
        }
    }

    fn print_thread(&self, thread: &CommentThread) {
        if thread.comments.is_empty() {
            println!("No comments yet.");
            return;
        }
        for comment in &thread.comments {
            let author = comment.author_name.as_deref().unwrap_or("anonymous");
            println!(
                "  [{}] {} at {}: {}",
                comment.id, author, comment.created_at, comment.content
            );
        }
    }

    async fn create_listing(&mut self, args: &[String]) -> Result<()> {
        let title = args[0].clone();
        let price: f64 = args[1]
            .parse()
            .map_err(|_| anyhow::anyhow!("price must be a number"))?;
        let mut draft = PropertyDraft {
            title,
            price,
            currency: "USD".into(),
            ..PropertyDraft::default()
        };
        let mut images = Vec::new();
        let mut rest = args[2..].iter();
        while let Some(arg) = rest.next() {
            if arg == "--image" {
                let Some(path) = rest.next() else {
                    println!("--image needs a file path");
                    return Ok(());
                };
                let bytes = tokio::fs::read(path).await?;
                images.push(ImageUpload {
                    file_name: path.clone(),
                    bytes,
                });
                continue;
            }
            let Some((key, value)) = arg.split_once('=') else {
                println!("Unrecognized argument '{arg}'");
                return Ok(());
            };
            match key {
                "description" => draft.description = Some(value.to_string()),
                "currency" => draft.currency = value.to_string(),
                "rent" => draft.is_for_rent = value.parse()?,
                "location" => draft.location = Some(value.to_string()),
                "bedrooms" => draft.bedrooms = Some(value.parse()?),
                "bathrooms" => draft.bathrooms = Some(value.parse()?),
                "sqft" => draft.square_feet = Some(value.parse()?),
                "phone" => draft.contact_phone = Some(value.to_string()),
                other => {
                    println!("Unknown listing field '{other}'");
                    return Ok(());
                }
            }
        }
        let property = self
            .listings
            .create(&self.resolver.current(), &draft, &images)
            .await?;
        println!(
            "Created listing {} with {} image(s)",
            property.id,
            property.images.len()
        );
        Ok(())
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    )
}

fn parse_filter(args: &[String]) -> Result<FilterCriteria> {
    let mut filter = FilterCriteria::default();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            anyhow::bail!("filters are key=value pairs, got '{arg}'");
        };
        match key {
            "location" => filter.location = Some(value.to_string()),
            "min_price" => filter.min_price = Some(value.parse()?),
            "max_price" => filter.max_price = Some(value.parse()?),
            "bedrooms" => filter.bedrooms = Some(value.parse()?),
            "bathrooms" => filter.bathrooms = Some(value.parse()?),
            "rent" => filter.is_for_rent = Some(value.parse()?),
            "min_sqft" => filter.min_square_feet = Some(value.parse()?),
            "max_sqft" => filter.max_square_feet = Some(value.parse()?),
            "days" => filter.posted_within_days = Some(value.parse()?),
            "currency" => filter.currency = Some(value.to_string()),
            other => anyhow::bail!("unknown filter '{other}'"),
        }
    }
    Ok(filter)
}
