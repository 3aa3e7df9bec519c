//! # Command-Line Interface
//!
//! Thin front end over [`PostResolver`]: every subcommand runs exactly
//! one pipeline against the SQLite store in the current directory.
//!
//! | Command | Pipeline |
//! |---------|----------|
//! | `list`, `get` | read pipelines |
//! | `search`, `adjacent` | specialized read paths |
//! | `create`, `update`, `delete` | mutation pipelines |
//! | `stats` | dashboard counts |
//!
//! Mutations need `--as-author <id>`; reads without it run anonymously
//! and therefore only see published content.

mod output;

pub use output::{Output, OutputFormat};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::domain::{Caller, PostStatus, PostType, Role, TaxonomyInput};
use crate::resolver::input::{CreatePostInput, GetPostArgs, PostFilters, UpdatePostInput};
use crate::resolver::{Environment, PostResolver};
use crate::storage::{AppConfig, PostStore, SortDir, SortField, SqliteStore};

#[derive(Parser)]
#[command(name = "quill")]
#[command(author, version, about = "Pipeline-based content management backend")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Run as this author account (required for mutations)
    #[arg(long, global = true)]
    pub as_author: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a site in a directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// List posts
    List {
        /// Content type (post or page)
        #[arg(long = "type")]
        post_type: Option<PostType>,

        /// Status filter (draft, publish, trash)
        #[arg(long)]
        status: Option<PostStatus>,

        /// Only featured posts
        #[arg(long)]
        featured: bool,

        /// Filter by taxonomy slug
        #[arg(long)]
        tag: Option<String>,

        /// Filter by author id
        #[arg(long)]
        author: Option<i64>,

        /// Filter by a navigation menu entry
        #[arg(long)]
        menu: Option<String>,

        /// Substring search on titles
        #[arg(long)]
        search: Option<String>,

        /// Sort field (id, created_at, updated_at, published_at)
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort direction (asc, desc)
        #[arg(long)]
        sort_order: Option<String>,

        #[arg(long)]
        offset: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show a single post
    Get {
        /// Post slug
        slug: Option<String>,

        /// Post id
        #[arg(long)]
        id: Option<i64>,

        #[arg(long = "type")]
        post_type: Option<PostType>,

        /// Render the draft revision instead of the published body
        #[arg(long)]
        preview: bool,
    },

    /// Fuzzy-search published posts
    Search {
        query: String,
    },

    /// Show the previous/next published articles around a slug
    Adjacent {
        slug: String,
    },

    /// Create a post
    Create {
        title: String,

        /// Source markup
        #[arg(long, conflicts_with = "md_file")]
        md: Option<String>,

        /// Read source markup from a file
        #[arg(long)]
        md_file: Option<PathBuf>,

        #[arg(long = "type", default_value = "post")]
        post_type: PostType,

        #[arg(long, default_value = "draft")]
        status: PostStatus,

        #[arg(long)]
        excerpt: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long)]
        cover_image: Option<String>,

        #[arg(long)]
        featured: bool,

        /// Tag names (repeatable)
        #[arg(long)]
        tag: Vec<String>,

        /// Category names (repeatable)
        #[arg(long)]
        category: Vec<String>,
    },

    /// Update a post
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        slug: Option<String>,

        #[arg(long, conflicts_with = "md_file")]
        md: Option<String>,

        #[arg(long)]
        md_file: Option<PathBuf>,

        /// Save a draft revision without touching the published body
        #[arg(long)]
        md_draft: Option<String>,

        #[arg(long)]
        status: Option<PostStatus>,

        #[arg(long)]
        excerpt: Option<String>,

        #[arg(long)]
        cover_image: Option<String>,

        #[arg(long)]
        featured: Option<bool>,

        /// Replacement tag set (repeatable)
        #[arg(long)]
        tag: Vec<String>,

        /// Replacement category set (repeatable)
        #[arg(long)]
        category: Vec<String>,

        /// Remove every taxonomy association
        #[arg(long, conflicts_with_all = ["tag", "category"])]
        clear_taxonomies: bool,
    },

    /// Trash a post, or remove an already-trashed post
    Delete {
        id: i64,
    },

    /// Show per-status content counts
    Stats,
}

/// Parses arguments and executes the appropriate command
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    let out = Output::new(cli.format);

    if let Commands::Init { path } = &cli.command {
        return init(Path::new(path), &out);
    }

    let dir = std::env::current_dir().context("Cannot determine working directory")?;
    let config = AppConfig::load(&dir)?;
    let store = Arc::new(SqliteStore::open(&config.database_path(&dir))?);
    let caller = resolve_caller(store.as_ref(), cli.as_author)?;

    let env = Environment::new(store, config.site.clone());
    let resolver = PostResolver::new(env)?;

    dispatch(cli.command, &resolver, caller, &out)
}

fn init(path: &Path, out: &Output) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    let config_path = path.join("quillpress.toml");
    if !config_path.exists() {
        AppConfig::write_default(path)?;
    }

    let config = AppConfig::load(path)?;
    let store = SqliteStore::open(&config.database_path(path))?;

    if store.author(1)?.is_none() {
        store.create_author("admin", Role::Admin)?;
    }

    out.success(&format!("Initialized site at {}", path.display()));
    Ok(())
}

fn resolve_caller(store: &dyn PostStore, as_author: Option<i64>) -> Result<Caller> {
    match as_author {
        None => Ok(Caller::anonymous()),
        Some(id) => {
            let Some(author) = store.author(id)? else {
                bail!("author {} not found; run `quill init` first", id);
            };
            Ok(Caller::authenticated(author.id, author.role))
        }
    }
}

fn parse_sort_by(raw: &str) -> Result<SortField> {
    match raw {
        "id" => Ok(SortField::Id),
        "created_at" => Ok(SortField::CreatedAt),
        "updated_at" => Ok(SortField::UpdatedAt),
        "published_at" => Ok(SortField::PublishedAt),
        other => bail!("unknown sort field: {}", other),
    }
}

fn parse_sort_order(raw: &str) -> Result<SortDir> {
    match raw {
        "asc" => Ok(SortDir::Asc),
        "desc" => Ok(SortDir::Desc),
        other => bail!("unknown sort direction: {}", other),
    }
}

fn read_markup(md: Option<String>, md_file: Option<PathBuf>) -> Result<Option<String>> {
    match (md, md_file) {
        (Some(inline), _) => Ok(Some(inline)),
        (None, Some(path)) => Ok(Some(fs::read_to_string(&path).with_context(|| {
            format!("Failed to read markup file: {}", path.display())
        })?)),
        (None, None) => Ok(None),
    }
}

fn taxonomy_inputs(tags: Vec<String>, categories: Vec<String>) -> Vec<TaxonomyInput> {
    tags.into_iter()
        .map(TaxonomyInput::tag)
        .chain(categories.into_iter().map(TaxonomyInput::category))
        .collect()
}

fn dispatch(command: Commands, resolver: &PostResolver, caller: Caller, out: &Output) -> Result<()> {
    match command {
        Commands::Init { .. } => unreachable!("handled before dispatch"),

        Commands::List {
            post_type,
            status,
            featured,
            tag,
            author,
            menu,
            search,
            sort_by,
            sort_order,
            offset,
            limit,
        } => {
            let filters = PostFilters {
                post_type,
                status,
                featured: featured.then_some(true),
                tag,
                author_id: author,
                menu,
                search,
                sort_by: sort_by.as_deref().map(parse_sort_by).transpose()?,
                sort_order: sort_order.as_deref().map(parse_sort_order).transpose()?,
                offset,
                limit,
            };

            let page = resolver.list_posts(filters, caller)?;
            if out.is_json() {
                out.data(&page)?;
            } else {
                out.row(&["ID", "STATUS", "TYPE", "TITLE"]);
                for post in &page.rows {
                    out.row(&[
                        &post.id.to_string(),
                        post.status.as_str(),
                        post.post_type.as_str(),
                        &post.title,
                    ]);
                }
                out.success(&format!("{} total", page.count));
            }
            Ok(())
        }

        Commands::Get {
            slug,
            id,
            post_type,
            preview,
        } => {
            if slug.is_none() && id.is_none() {
                bail!("pass a slug or --id");
            }

            let args = GetPostArgs {
                id,
                slug,
                post_type,
                status: None,
                preview,
            };

            match resolver.get_post(args, caller)? {
                Some(post) => out.data(&post)?,
                None => out.success("No matching post"),
            }
            Ok(())
        }

        Commands::Search { query } => {
            let page = resolver.search_posts(&query)?;
            if out.is_json() {
                out.data(&page)?;
            } else {
                for hit in &page.rows {
                    out.row(&[&hit.id.to_string(), &hit.title, &hit.slug]);
                }
                out.success(&format!("{} matches", page.count));
            }
            Ok(())
        }

        Commands::Adjacent { slug } => {
            let adjacent = resolver.adjacent_posts(&slug)?;
            out.data(&adjacent)?;
            Ok(())
        }

        Commands::Create {
            title,
            md,
            md_file,
            post_type,
            status,
            excerpt,
            slug,
            cover_image,
            featured,
            tag,
            category,
        } => {
            let input = CreatePostInput {
                title,
                post_type,
                status,
                md: read_markup(md, md_file)?.unwrap_or_default(),
                excerpt: excerpt.unwrap_or_default(),
                slug,
                cover_image,
                cover_image_width: None,
                cover_image_height: None,
                featured,
                taxonomies: taxonomy_inputs(tag, category),
            };

            let post = resolver.create_post(input, caller)?;
            out.data(&post)?;
            Ok(())
        }

        Commands::Update {
            id,
            title,
            slug,
            md,
            md_file,
            md_draft,
            status,
            excerpt,
            cover_image,
            featured,
            tag,
            category,
            clear_taxonomies,
        } => {
            let taxonomies = if clear_taxonomies {
                Some(Vec::new())
            } else if !tag.is_empty() || !category.is_empty() {
                Some(taxonomy_inputs(tag, category))
            } else {
                None
            };

            let input = UpdatePostInput {
                id,
                title,
                slug,
                featured,
                status,
                cover_image,
                cover_image_width: None,
                cover_image_height: None,
                md: read_markup(md, md_file)?,
                md_draft,
                excerpt,
                taxonomies,
            };

            let post = resolver.update_post(input, caller)?;
            out.data(&post)?;
            Ok(())
        }

        Commands::Delete { id } => {
            let result = resolver.delete_post(id, caller)?;
            if result.removed {
                out.success(&format!("Post {} removed", result.id));
            } else {
                out.success(&format!("Post {} moved to trash", result.id));
            }
            Ok(())
        }

        Commands::Stats => {
            let summary = resolver.stats(caller)?;
            out.data(&summary)?;
            Ok(())
        }
    }
}
