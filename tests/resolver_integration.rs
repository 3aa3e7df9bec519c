//! End-to-end pipeline tests against an in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quillpress::domain::{
    Author, Caller, Menu, MenuItem, Post, PostStatus, PostType, Role, Taxonomy, TaxonomyInput,
    TaxonomyKind,
};
use quillpress::resolver::input::{CreatePostInput, GetPostArgs, PostFilters, UpdatePostInput};
use quillpress::resolver::{Authorizer, Environment, Operation, PostResolver};
use quillpress::storage::{
    NewPost, PostCriteria, PostPatch, PostStore, SiteConfig, SqliteStore, StatusCounts, StoreError,
};
use quillpress::PostView;

fn setup() -> (Arc<SqliteStore>, PostResolver) {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.create_author("admin", Role::Admin).unwrap();

    let env = Environment::new(store.clone(), SiteConfig::new("https://example.com", ""));
    let resolver = PostResolver::new(env).unwrap();
    (store, resolver)
}

fn admin() -> Caller {
    Caller::authenticated(1, Role::Admin)
}

fn create(resolver: &PostResolver, title: &str, md: &str, status: PostStatus) -> PostView {
    resolver
        .create_post(
            CreatePostInput {
                title: title.to_string(),
                md: md.to_string(),
                status,
                ..CreatePostInput::default()
            },
            admin(),
        )
        .unwrap()
}

fn raw(store: &SqliteStore, id: i64) -> Post {
    store.find_one(&PostCriteria::by_id(id)).unwrap().unwrap()
}

#[test]
fn created_post_is_normalized() {
    let (_store, resolver) = setup();

    let view = resolver
        .create_post(
            CreatePostInput {
                title: "Hello World".into(),
                md: "# Hi".into(),
                status: PostStatus::Publish,
                cover_image: Some("/img/x.png".into()),
                ..CreatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    assert_eq!(view.slug, "/post/hello-world");
    assert_eq!(view.cover_image.src, "https://example.com/img/x.png");
    assert!(view.html.contains("<h1>Hi</h1>"));
    assert!(view.published_at.is_some());
}

#[test]
fn create_suffixes_a_colliding_slug() {
    let (_store, resolver) = setup();

    let first = create(&resolver, "Hello", "one", PostStatus::Draft);
    let second = create(&resolver, "Hello", "two", PostStatus::Draft);

    assert_eq!(first.slug, "/post/hello");
    assert_eq!(second.slug, "/post/hello-1");
}

#[test]
fn create_requires_a_title() {
    let (_store, resolver) = setup();

    let err = resolver
        .create_post(CreatePostInput::default(), admin())
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(err.messages().iter().any(|m| m.contains("title")));
}

#[test]
fn anonymous_listing_only_sees_published_posts() {
    let (_store, resolver) = setup();
    create(&resolver, "Public", "p", PostStatus::Publish);
    create(&resolver, "Secret", "s", PostStatus::Draft);

    let public = resolver
        .list_posts(PostFilters::default(), Caller::anonymous())
        .unwrap();
    assert_eq!(public.count, 1);
    assert_eq!(public.rows[0].title, "Public");

    let all = resolver
        .list_posts(PostFilters::default(), admin())
        .unwrap();
    assert_eq!(all.count, 2);
}

#[test]
fn listing_truncates_bodies() {
    let (_store, resolver) = setup();
    create(&resolver, "Public", "a long body", PostStatus::Publish);

    let page = resolver
        .list_posts(PostFilters::default(), Caller::anonymous())
        .unwrap();

    assert_eq!(page.rows[0].md, "...[truncated]");
    assert_eq!(page.rows[0].html, "...[truncated]");
}

#[test]
fn get_post_returns_null_for_a_missing_record() {
    let (_store, resolver) = setup();

    let result = resolver
        .get_post(
            GetPostArgs {
                slug: Some("nope".into()),
                ..GetPostArgs::default()
            },
            Caller::anonymous(),
        )
        .unwrap();

    assert!(result.is_none());
}

#[test]
fn update_recomputes_reading_time_from_rendered_body() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Short", "hello", PostStatus::Publish);
    assert_eq!(view.reading_time, "1 min read");

    let long_body = "word ".repeat(600);
    let updated = resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                md: Some(long_body),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    // 600 words at 250 wpm
    assert_eq!(updated.reading_time, "3 min read");
    assert_eq!(raw(&store, view.id).reading_time, "3 min read");
}

#[test]
fn update_with_unchanged_body_keeps_reading_time() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Short", "hello", PostStatus::Publish);

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                md: Some("hello".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    assert_eq!(raw(&store, view.id).reading_time, "1 min read");
}

#[test]
fn title_change_rederives_the_slug() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Old Title", "x", PostStatus::Draft);

    let updated = resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                title: Some("Fresh Title".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    assert_eq!(updated.slug, "/post/fresh-title");
    assert_eq!(raw(&store, view.id).slug, "fresh-title");
}

#[test]
fn slug_collision_on_update_fails_and_mutates_nothing() {
    let (store, resolver) = setup();
    create(&resolver, "Hello", "x", PostStatus::Draft);
    let other = create(&resolver, "World", "y", PostStatus::Draft);

    let err = resolver
        .update_post(
            UpdatePostInput {
                id: other.id,
                title: Some("Hello".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(err.messages().iter().any(|m| m.contains("slug")));

    let record = raw(&store, other.id);
    assert_eq!(record.title, "World");
    assert_eq!(record.slug, "world");
}

#[test]
fn publish_timestamp_is_set_once_and_never_overwritten() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Draft Post", "x", PostStatus::Draft);
    assert!(raw(&store, view.id).published_at.is_none());

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                status: Some(PostStatus::Publish),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let first_publish = raw(&store, view.id).published_at.unwrap();

    std::thread::sleep(std::time::Duration::from_millis(10));

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                title: Some("Renamed While Published".into()),
                status: Some(PostStatus::Publish),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    assert_eq!(raw(&store, view.id).published_at.unwrap(), first_publish);
}

#[test]
fn update_syncs_menu_labels_on_title_change() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Hello", "x", PostStatus::Publish);

    store
        .save_menu(&Menu {
            items: vec![
                MenuItem {
                    label: "Hello".into(),
                    post_id: Some(view.id),
                    slug: None,
                },
                MenuItem {
                    label: "About".into(),
                    post_id: None,
                    slug: Some("/page/about".into()),
                },
            ],
        })
        .unwrap();

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                title: Some("Welcome".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let menu = store.menu().unwrap();
    assert_eq!(menu.items[0].label, "Welcome");
    assert_eq!(menu.items[1].label, "About");
}

#[test]
fn update_diffs_taxonomy_associations() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Tagged", "x", PostStatus::Publish);

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                taxonomies: Some(vec![TaxonomyInput::tag("Rust"), TaxonomyInput::tag("Go")]),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let mut names: Vec<String> = store
        .taxonomies_for_post(view.id)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Go", "Rust"]);

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                taxonomies: Some(vec![
                    TaxonomyInput::tag("Rust"),
                    TaxonomyInput::category("News"),
                ]),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let linked = store.taxonomies_for_post(view.id).unwrap();
    assert_eq!(linked.len(), 2);
    assert!(linked.iter().any(|t| t.name == "Rust"));
    assert!(linked
        .iter()
        .any(|t| t.name == "News" && t.kind == TaxonomyKind::Category));

    // the detached tag record survives
    assert!(store
        .find_taxonomy(TaxonomyKind::Tag, "Go")
        .unwrap()
        .is_some());
}

#[test]
fn update_of_a_missing_post_is_not_found() {
    let (_store, resolver) = setup();

    let err = resolver
        .update_post(
            UpdatePostInput {
                id: 99,
                title: Some("Anything".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), "not_found");
}

#[test]
fn preview_renders_the_draft_revision_for_authenticated_callers() {
    let (_store, resolver) = setup();
    let view = create(&resolver, "Hello", "published body", PostStatus::Publish);

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                md_draft: Some("draft *revision*".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let args = GetPostArgs {
        id: Some(view.id),
        preview: true,
        ..GetPostArgs::default()
    };

    let previewed = resolver.get_post(args.clone(), admin()).unwrap().unwrap();
    assert!(previewed.html.contains("<em>revision</em>"));

    // anonymous callers never see draft revisions
    let public = resolver
        .get_post(args, Caller::anonymous())
        .unwrap()
        .unwrap();
    assert!(public.html.contains("published body"));
}

#[test]
fn saving_a_body_discards_the_draft_revision() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Hello", "v1", PostStatus::Publish);

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                md_draft: Some("draft".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();
    assert!(raw(&store, view.id).md_draft.is_some());

    resolver
        .update_post(
            UpdatePostInput {
                id: view.id,
                md: Some("v2".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap();
    assert!(raw(&store, view.id).md_draft.is_none());
}

#[test]
fn adjacency_walks_ids_within_the_published_filter_set() {
    let (_store, resolver) = setup();
    create(&resolver, "One", "x", PostStatus::Publish);
    create(&resolver, "Two", "x", PostStatus::Publish);
    create(&resolver, "Three", "x", PostStatus::Publish);

    let middle = resolver.adjacent_posts("two").unwrap();
    assert_eq!(middle.previous.as_ref().map(|p| p.id), Some(1));
    assert_eq!(middle.next.as_ref().map(|p| p.id), Some(3));

    let first = resolver.adjacent_posts("one").unwrap();
    assert!(first.previous.is_none());
    assert_eq!(first.next.as_ref().map(|p| p.id), Some(2));

    let last = resolver.adjacent_posts("three").unwrap();
    assert_eq!(last.previous.as_ref().map(|p| p.id), Some(2));
    assert!(last.next.is_none());
}

#[test]
fn adjacency_skips_records_outside_the_filter_set() {
    let (_store, resolver) = setup();
    create(&resolver, "One", "x", PostStatus::Publish);
    create(&resolver, "Hidden", "x", PostStatus::Draft);
    create(&resolver, "Three", "x", PostStatus::Publish);

    let result = resolver.adjacent_posts("three").unwrap();
    assert_eq!(result.previous.as_ref().map(|p| p.id), Some(1));
}

#[test]
fn adjacency_without_an_anchor_is_a_hard_failure() {
    let (_store, resolver) = setup();
    create(&resolver, "One", "x", PostStatus::Publish);

    let err = resolver.adjacent_posts("missing").unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn search_never_exposes_bodies_and_caps_at_six() {
    let (_store, resolver) = setup();
    for i in 0..8 {
        create(
            &resolver,
            &format!("Hello Number {i}"),
            "body text",
            PostStatus::Publish,
        );
    }

    let page = resolver.search_posts("hello").unwrap();
    assert_eq!(page.rows.len(), 6);
    assert_eq!(page.count, 6);

    let serialized = serde_json::to_value(&page.rows[0]).unwrap();
    let keys: Vec<&str> = serialized
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert!(!keys.contains(&"html"));
    assert!(!keys.contains(&"md"));
}

#[test]
fn search_ranks_title_matches_above_body_matches() {
    let (_store, resolver) = setup();
    let body_only = resolver
        .create_post(
            CreatePostInput {
                title: "Unrelated Writing".into(),
                md: "this body says hello somewhere".into(),
                status: PostStatus::Publish,
                ..CreatePostInput::default()
            },
            admin(),
        )
        .unwrap();
    let title_match = create(&resolver, "Hello World", "nothing relevant", PostStatus::Publish);

    let page = resolver.search_posts("hello").unwrap();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].id, title_match.id);
    assert_eq!(page.rows[1].id, body_only.id);
}

#[test]
fn empty_search_query_returns_an_empty_set() {
    let (_store, resolver) = setup();
    create(&resolver, "Hello", "x", PostStatus::Publish);

    let page = resolver.search_posts("   ").unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.count, 0);
}

#[test]
fn search_ignores_unpublished_posts() {
    let (_store, resolver) = setup();
    create(&resolver, "Hello Draft", "x", PostStatus::Draft);

    let page = resolver.search_posts("hello").unwrap();
    assert!(page.rows.is_empty());
}

#[test]
fn delete_is_trash_first_then_removal() {
    let (store, resolver) = setup();
    let view = create(&resolver, "Doomed", "x", PostStatus::Publish);

    let trashed = resolver.delete_post(view.id, admin()).unwrap();
    assert!(!trashed.removed);
    assert_eq!(raw(&store, view.id).status, PostStatus::Trash);

    let removed = resolver.delete_post(view.id, admin()).unwrap();
    assert!(removed.removed);
    assert!(store
        .find_one(&PostCriteria::by_id(view.id))
        .unwrap()
        .is_none());
}

#[test]
fn stats_counts_by_type_and_status() {
    let (_store, resolver) = setup();
    create(&resolver, "One", "x", PostStatus::Publish);
    create(&resolver, "Two", "x", PostStatus::Draft);
    resolver
        .create_post(
            CreatePostInput {
                title: "Starred".into(),
                status: PostStatus::Publish,
                featured: true,
                ..CreatePostInput::default()
            },
            admin(),
        )
        .unwrap();

    let summary = resolver.stats(admin()).unwrap();
    assert_eq!(summary.posts.publish, 2);
    assert_eq!(summary.posts.draft, 1);
    assert_eq!(summary.featured, 1);
}

// ---------------------------------------------------------------------------
// Gate short-circuit: a denied operation must never reach storage
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SpyStore {
    calls: AtomicUsize,
}

impl SpyStore {
    fn total(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl PostStore for SpyStore {
    fn find_one(&self, _: &PostCriteria) -> Result<Option<Post>, StoreError> {
        self.touch();
        Ok(None)
    }
    fn find_all(&self, _: &PostCriteria) -> Result<Vec<Post>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }
    fn count(&self, _: &PostCriteria) -> Result<u64, StoreError> {
        self.touch();
        Ok(0)
    }
    fn create(&self, _: &NewPost) -> Result<Post, StoreError> {
        self.touch();
        Err(StoreError::NotFound)
    }
    fn update(&self, _: i64, _: &PostPatch) -> Result<Post, StoreError> {
        self.touch();
        Err(StoreError::NotFound)
    }
    fn delete(&self, _: i64) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }
    fn taxonomies_for_post(&self, _: i64) -> Result<Vec<Taxonomy>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }
    fn find_taxonomy(&self, _: TaxonomyKind, _: &str) -> Result<Option<Taxonomy>, StoreError> {
        self.touch();
        Ok(None)
    }
    fn create_taxonomy(&self, _: &TaxonomyInput) -> Result<Taxonomy, StoreError> {
        self.touch();
        Err(StoreError::NotFound)
    }
    fn attach_taxonomy(&self, _: i64, _: i64) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }
    fn detach_taxonomy(&self, _: i64, _: i64) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }
    fn menu(&self) -> Result<Menu, StoreError> {
        self.touch();
        Ok(Menu::default())
    }
    fn save_menu(&self, _: &Menu) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }
    fn author(&self, _: i64) -> Result<Option<Author>, StoreError> {
        self.touch();
        Ok(None)
    }
    fn create_author(&self, _: &str, _: Role) -> Result<Author, StoreError> {
        self.touch();
        Err(StoreError::NotFound)
    }
    fn status_counts(&self, _: PostType) -> Result<StatusCounts, StoreError> {
        self.touch();
        Ok(StatusCounts::default())
    }
}

struct DenyAll;

impl Authorizer for DenyAll {
    fn authorize(&self, _: &Caller, _: Operation) -> bool {
        false
    }
}

#[test]
fn gate_denial_prevents_any_storage_access() {
    let spy = Arc::new(SpyStore::default());
    let env = Environment::new(spy.clone(), SiteConfig::default()).with_auth(Arc::new(DenyAll));
    let resolver = PostResolver::new(env).unwrap();

    let err = resolver
        .update_post(
            UpdatePostInput {
                id: 1,
                title: Some("Blocked".into()),
                ..UpdatePostInput::default()
            },
            admin(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "authorization");

    let err = resolver
        .create_post(
            CreatePostInput {
                title: "Blocked".into(),
                ..CreatePostInput::default()
            },
            admin(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), "authorization");

    let err = resolver
        .list_posts(PostFilters::default(), admin())
        .unwrap_err();
    assert_eq!(err.kind(), "authorization");

    let err = resolver.delete_post(1, admin()).unwrap_err();
    assert_eq!(err.kind(), "authorization");

    assert_eq!(spy.total(), 0);
}
