use std::sync::{Arc, Mutex};
use std::time::Duration;

use casagram::comments::CommentService;
use casagram::error::ClientError;
use casagram::feed::FeedAggregator;
use casagram::likes::{LikeCoordinator, ToggleOutcome};
use casagram::listings::{ImageUpload, ListingService, OwnerSort};
use casagram::models::{FilterCriteria, PropertyDraft};
use casagram::platform::{Platform, SignupInput};
use casagram::realtime::Reconciler;
use casagram::session::SessionResolver;
use casagram::store::Store;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tokio::time::sleep;

const MAX_UPLOAD: u64 = 5 * 1024 * 1024;
const DEBOUNCE: Duration = Duration::from_millis(20);

fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0; 16]);
    bytes
}

fn draft(title: &str, price: f64, is_for_rent: bool, location: &str) -> PropertyDraft {
    PropertyDraft {
        title: title.into(),
        price,
        currency: "EUR".into(),
        is_for_rent,
        location: Some(location.into()),
        ..PropertyDraft::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_client_flow_over_a_shared_store() {
    let temp = tempdir().expect("tempdir");
    let store = Store::open(&temp.path().join("casagram.db")).expect("open store");
    let platform: Arc<dyn Platform> = Arc::new(store);

    // Two users on the same backend.
    let alice_sessions = SessionResolver::new(platform.clone());
    let alice = alice_sessions
        .sign_up(SignupInput {
            email: "alice@example.com".into(),
            password: "password123".into(),
            full_name: Some("Alice".into()),
            username: Some("alice".into()),
        })
        .await
        .expect("alice signup");

    let bob_sessions = SessionResolver::new(platform.clone());
    bob_sessions
        .sign_up(SignupInput {
            email: "bob@example.com".into(),
            password: "password123".into(),
            full_name: Some("Bob".into()),
            username: None,
        })
        .await
        .expect("bob signup");

    // Alice posts two listings, one with a photo.
    let listings = ListingService::new(platform.clone(), MAX_UPLOAD);
    let flat = listings
        .create(
            &alice_sessions.current(),
            &draft("Sunny flat", 235_000.0, false, "Lisbon"),
            &[ImageUpload {
                file_name: "front.png".into(),
                bytes: png_bytes(),
            }],
        )
        .await
        .expect("create flat");
    listings
        .create(
            &alice_sessions.current(),
            &draft("Riverside studio", 1_200.0, true, "Porto"),
            &[],
        )
        .await
        .expect("create studio");
    assert!(flat.primary_image().is_some());

    // Bob's filtered feed sees only the rental.
    let feed = FeedAggregator::new(platform.clone(), 20);
    let rentals = FilterCriteria {
        is_for_rent: Some(true),
        ..FilterCriteria::default()
    };
    let bob_id = bob_sessions.current().user_id().map(str::to_string);
    let state = feed
        .load_first(&rentals, bob_id.as_deref())
        .await
        .expect("bob feed");
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].property.title, "Riverside studio");

    // Bob likes the flat from the unfiltered feed; the annotation is
    // viewer-specific.
    let mut bob_feed = feed
        .load_first(&FilterCriteria::default(), bob_id.as_deref())
        .await
        .expect("bob feed");
    let coordinator = LikeCoordinator::new(platform.clone());
    let outcome = coordinator
        .toggle(&mut bob_feed, &flat.id)
        .await
        .expect("toggle");
    assert_eq!(
        outcome,
        ToggleOutcome::Applied {
            liked: true,
            like_count: 1
        }
    );
    let alice_view = feed
        .load_first(&FilterCriteria::default(), Some(&alice.user_id))
        .await
        .expect("alice feed");
    let flat_item = alice_view
        .items
        .iter()
        .find(|item| item.property.id == flat.id)
        .expect("flat in feed");
    assert_eq!(flat_item.like_count, 1);
    assert!(!flat_item.liked_by_me);

    // Alice watches the flat's comment thread; Bob's comment arrives
    // through the reconciler, and Alice's own add is not duplicated by
    // its echo event.
    let comments = CommentService::new(platform.clone());
    let thread = Arc::new(Mutex::new(
        comments.load(&flat.id).await.expect("load thread"),
    ));
    let reconciler = Reconciler::new(platform.clone(), DEBOUNCE);
    let _watch = reconciler.watch_comments(&thread);

    let alice_echo = {
        let mut scratch = comments.load(&flat.id).await.expect("load");
        comments
            .add(&mut scratch, &alice_sessions.current(), "Open house Sunday")
            .await
            .expect("alice comment")
    };
    thread.lock().expect("lock").merge_insert(alice_echo);
    {
        let mut bob_thread = comments.load(&flat.id).await.expect("bob load");
        comments
            .add(&mut bob_thread, &bob_sessions.current(), "Is it still free?")
            .await
            .expect("bob comment");
    }
    sleep(DEBOUNCE * 5).await;
    {
        let local = thread.lock().expect("lock");
        assert_eq!(local.comments.len(), 2);
        assert_eq!(
            local.comments[0].content, "Open house Sunday",
            "ascending order"
        );
        assert_eq!(local.comments[1].author_name.as_deref(), Some("Bob"));
    }

    // Bob cannot delete Alice's listing; Alice can.
    let err = listings.delete(&bob_sessions.current(), &flat.id).await;
    assert!(matches!(err, Err(ClientError::NotFound(_))));
    listings
        .delete(&alice_sessions.current(), &flat.id)
        .await
        .expect("alice delete");
    let remaining = listings
        .load_for_owner(&alice_sessions.current(), OwnerSort::NewestFirst, None)
        .await
        .expect("owner listings");
    assert_eq!(remaining.posts.len(), 1);
    assert_eq!(remaining.posts[0].title, "Riverside studio");

    // Signing out drops the resolver back to anonymous and blocks writes.
    bob_sessions.sign_out().await.expect("sign out");
    let err = listings
        .create(
            &bob_sessions.current(),
            &draft("Ghost post", 1.0, false, "Nowhere"),
            &[],
        )
        .await;
    assert!(matches!(err, Err(ClientError::Unauthenticated)));
}
