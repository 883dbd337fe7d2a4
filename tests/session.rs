mod support;

use std::time::{Duration, Instant};

use gametracker::forms::MessageKind;
use gametracker::session::{self, Session};
use gametracker::store::LoadState;
use gametracker::{
    ApiError, ClickRegion, CollectionApi, CompletionFilter, Config, DashboardView, FormError, GameId,
    GameRecord, OverlayError, OverlayKind, ReleaseYear, ReviewId, Selector,
};
use support::{library, library_reviews, loaded_session, FakeApi, SERVER_ERROR};

fn ids(games: &[GameRecord]) -> Vec<&str> {
    games.iter().map(|g| g.id.0.as_str()).collect()
}

fn fill_create_form(session: &mut Session<FakeApi>) {
    session
        .edit_create_draft(|d| {
            d.title = "Celeste".into();
            d.platform = "PC".into();
            d.genre = "Platformer".into();
            d.release_year = "2018".into();
            d.developer = "Maddy Makes Games".into();
        })
        .unwrap();
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn load_failure_shows_banner_and_retry_recovers() {
    let mut session = Session::new(FakeApi::new(library(), vec![]), Config::default());
    assert_eq!(session.load_state(), &LoadState::Loading);

    session.api().fail("list_games");
    assert!(session.load_games().is_err());
    assert_eq!(session.load_state(), &LoadState::Failed(session::GAMES_LOAD_FAILED.into()));
    assert!(session.games().is_empty());

    session.api().recover("list_games");
    session.load_games().unwrap();
    assert_eq!(session.load_state(), &LoadState::Ready);
    assert_eq!(ids(session.visible_games()), vec!["g1", "g2", "g3"]);
    assert_eq!(session.statistics().total, 3);
}

#[test]
fn failed_retry_keeps_previous_games() {
    let mut session = loaded_session();
    session.api().fail("list_games");
    assert!(session.load_games().is_err());
    assert_eq!(session.games().len(), 3);
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn filters_compose_and_clear() {
    let mut session = loaded_session();
    assert_eq!(session.platform_options(), ["PC", "Switch"]);
    assert_eq!(session.genre_options(), ["Adventure", "Metroidvania", "Roguelike"]);

    session.set_query("  zELDa ");
    assert_eq!(ids(session.visible_games()), vec!["g1"]);

    session.set_query("");
    session.set_platform(Selector::Only("Switch".into()));
    assert_eq!(ids(session.visible_games()), vec!["g1", "g3"]);

    session.set_completion(CompletionFilter::Pending);
    assert!(session.visible_games().is_empty());
    assert!(session.criteria().has_active_filters());

    session.clear_filters();
    assert!(!session.criteria().has_active_filters());
    assert_eq!(session.visible_games().len(), 3);
}

#[test]
fn query_matches_developer() {
    let mut session = loaded_session();
    session.set_query("hades studio");
    assert_eq!(ids(session.visible_games()), vec!["g2"]);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn created_game_is_prepended_and_stats_follow() {
    let now = Instant::now();
    let mut session = loaded_session();
    fill_create_form(&mut session);

    let id = session.submit_create(now).unwrap();
    assert_eq!(session.games()[0].id, id);
    assert_eq!(session.games().len(), 4);
    assert_eq!(session.statistics().total, 4);
    assert_eq!(session.statistics().pending, 2);
    assert_eq!(session.platform_options(), ["PC", "Switch"]);

    let form = session.create_form();
    assert_eq!(form.draft().title, "");
    let message = form.message().unwrap();
    assert_eq!(message.text, session::CREATE_GAME.success);
    assert_eq!(message.kind, MessageKind::Success);

    session.tick(now + Duration::from_secs(4));
    assert!(session.create_form().message().is_none());
}

#[test]
fn created_game_respects_active_filters() {
    let mut session = loaded_session();
    session.set_platform(Selector::Only("Switch".into()));
    fill_create_form(&mut session);
    session.submit_create(Instant::now()).unwrap();

    assert_eq!(session.games().len(), 4);
    assert_eq!(ids(session.visible_games()), vec!["g1", "g3"]);
}

#[test]
fn second_submit_while_pending_sends_nothing() {
    let now = Instant::now();
    let mut session = loaded_session();
    fill_create_form(&mut session);

    let payload = session.begin_create(now).unwrap();
    assert!(session.create_form().is_submitting());
    assert!(matches!(session.submit_create(now), Err(FormError::Busy)));
    assert_eq!(session.api().calls("create_game"), 0);

    let created = GameRecord {
        id: GameId::from("g9"),
        title: payload.title.clone(),
        platform: payload.platform.clone(),
        genre: payload.genre.clone(),
        release_year: ReleaseYear::Year(payload.release_year),
        developer: payload.developer.clone(),
        cover_url: None,
        description: None,
        completed: false,
    };
    session.complete_create(now, Ok(created)).unwrap();
    assert_eq!(session.games()[0].id, GameId::from("g9"));
    assert!(!session.create_form().is_submitting());
}

#[test]
fn invalid_create_form_never_reaches_the_backend() {
    let mut session = loaded_session();
    session.edit_create_draft(|d| d.title = "Only a title".into()).unwrap();
    assert!(matches!(session.submit_create(Instant::now()), Err(FormError::Invalid(_))));
    assert_eq!(session.api().calls("create_game"), 0);
    assert_eq!(session.create_form().message().unwrap().kind, MessageKind::Error);
}

#[test]
fn failed_create_keeps_draft_and_shows_server_text() {
    let mut session = loaded_session();
    fill_create_form(&mut session);
    session.api().fail("create_game");

    assert!(matches!(session.submit_create(Instant::now()), Err(FormError::Api(_))));
    assert_eq!(session.games().len(), 3);
    assert_eq!(session.create_form().draft().title, "Celeste");
    assert_eq!(session.create_form().message().unwrap().text, SERVER_ERROR);
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

#[test]
fn edit_replaces_in_place_and_closes_after_delay() {
    let now = Instant::now();
    let mut session = loaded_session();
    let id = GameId::from("g2");
    session.open_detail(&id).unwrap();
    session.open_edit(&id).unwrap();
    assert_eq!(session.edit_form().unwrap().draft().title, "Hades");
    assert_eq!(session.edit_form().unwrap().draft().release_year, "2020");

    session
        .edit_edit_draft(|d| {
            d.title = "Hades II".into();
            d.completed = true;
        })
        .unwrap();
    session.submit_edit(now).unwrap();

    assert_eq!(ids(session.games()), vec!["g1", "g2", "g3"]);
    assert_eq!(session.games()[1].title, "Hades II");
    assert_eq!(session.statistics().completed, 3);
    assert_eq!(session.overlays().detail_game().unwrap().title, "Hades II");
    assert!(session.overlays().is_open(OverlayKind::Edit));

    session.tick(now + Duration::from_millis(999));
    assert!(session.overlays().is_open(OverlayKind::Edit));

    session.tick(now + Duration::from_secs(1));
    assert_eq!(session.overlays().open_kinds(), vec![OverlayKind::Detail]);
    assert!(session.edit_form().is_none());
}

#[test]
fn failed_edit_keeps_overlay_open() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_edit(&GameId::from("g1")).unwrap();
    session.api().fail("update_game");
    session.edit_edit_draft(|d| d.title = "Zelda".into()).unwrap();

    assert!(session.submit_edit(now).is_err());
    assert_eq!(session.games()[0].title, "The Legend of Zelda");
    session.tick(now + Duration::from_secs(5));
    assert!(session.overlays().is_open(OverlayKind::Edit));
    assert_eq!(session.edit_form().unwrap().draft().title, "Zelda");
}

#[test]
fn submit_edit_without_overlay_is_rejected() {
    let mut session = loaded_session();
    assert!(matches!(session.submit_edit(Instant::now()), Err(FormError::NotOpen)));
    assert!(matches!(session.edit_edit_draft(|_| {}), Err(FormError::NotOpen)));
}

#[test]
fn edit_confirmed_after_its_overlay_closed_still_updates_the_cache() {
    let now = Instant::now();
    let mut session = loaded_session();
    let id = GameId::from("g2");
    session.open_edit(&id).unwrap();
    session.edit_edit_draft(|d| d.title = "Hades II".into()).unwrap();

    let submission = session.begin_edit(now).unwrap();
    assert!(session.edit_form().unwrap().is_submitting());
    assert!(matches!(session.begin_edit(now), Err(FormError::Busy)));

    session.close_overlay(OverlayKind::Edit);
    assert!(session.edit_form().is_none());
    let result = session.api().update_game(&submission.id, &submission.payload);
    session.complete_edit(&submission.id, now, result).unwrap();

    assert_eq!(session.games()[1].title, "Hades II");
    assert!(session.edit_form().is_none());
    assert_eq!(session.api().calls("update_game"), 1);
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

#[test]
fn edit_over_detail_releases_page_resources_in_order() {
    let mut session = loaded_session();
    let id = GameId::from("g1");
    session.open_detail(&id).unwrap();
    session.open_edit(&id).unwrap();
    assert_eq!(session.overlays().key_listeners().count(), 2);

    assert_eq!(session.close_overlay(OverlayKind::Edit), vec![OverlayKind::Edit]);
    assert!(session.overlays().is_open(OverlayKind::Detail));
    assert!(session.overlays().scroll_lock().is_locked());
    assert_eq!(session.overlays().key_listeners().count(), 1);

    session.close_overlay(OverlayKind::Detail);
    assert!(!session.overlays().scroll_lock().is_locked());
    assert_eq!(session.overlays().key_listeners().count(), 0);
    assert!(session.reviews().is_none());
}

#[test]
fn escape_and_backdrop_close_the_right_overlay() {
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.load_reviews();
    session.open_review_form(None).unwrap();

    assert!(session.click_overlay(OverlayKind::ReviewForm, ClickRegion::Content).is_empty());
    assert_eq!(session.press_escape(), Some(OverlayKind::ReviewForm));
    assert!(session.review_form().is_none());
    assert!(session.reviews().is_some());

    session.click_overlay(OverlayKind::Detail, ClickRegion::Backdrop);
    assert!(!session.overlays().any_open());
    assert_eq!(session.press_escape(), None);
}

#[test]
fn unknown_game_cannot_be_opened() {
    let mut session = loaded_session();
    assert_eq!(
        session.open_detail(&GameId::from("nope")).unwrap_err(),
        OverlayError::UnknownGame("nope".into())
    );
    assert!(!session.overlays().any_open());
}

#[test]
fn dashboard_is_exclusive_and_reflects_the_collection() {
    let mut session = Session::new(FakeApi::new(vec![], vec![]), Config::default());
    session.load_games().unwrap();
    assert_eq!(session.dashboard_view(), DashboardView::NoStatistics);

    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.open_dashboard();
    assert_eq!(session.overlays().open_kinds(), vec![OverlayKind::Dashboard]);
    assert!(session.reviews().is_none());

    match session.dashboard_view() {
        DashboardView::Summary { summary, top_platforms, .. } => {
            assert_eq!(summary.completion_percent, 67);
            assert_eq!(summary.earliest_year, Some(2017));
            assert_eq!(summary.latest_year, Some(2020));
            assert_eq!(top_platforms[0].name, "Switch");
            assert_eq!(top_platforms[0].count, 2);
        }
        other => panic!("expected a summary, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[test]
fn detail_shows_only_that_games_reviews() {
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    assert_eq!(session.reviews().unwrap().load_state(), &LoadState::Loading);

    assert!(session.load_reviews());
    let panel = session.reviews().unwrap();
    let review_ids: Vec<_> = panel.reviews().iter().map(|r| r.id.0.as_str()).collect();
    assert_eq!(review_ids, vec!["r1", "r3"]);
    assert_eq!(panel.load_state(), &LoadState::Ready);
}

#[test]
fn late_review_fetch_for_previous_game_is_dropped() {
    let mut session = loaded_session();
    let first = session.open_detail(&GameId::from("g1")).unwrap();
    let second = session.open_detail(&GameId::from("g2")).unwrap();

    assert!(!session.commit_reviews(first, Ok(library_reviews())));
    assert_eq!(session.reviews().unwrap().load_state(), &LoadState::Loading);

    assert!(session.commit_reviews(second, Ok(library_reviews())));
    let panel = session.reviews().unwrap();
    assert_eq!(panel.game_id(), &GameId::from("g2"));
    assert_eq!(panel.reviews().len(), 1);
}

#[test]
fn review_fetch_after_close_is_dropped() {
    let mut session = loaded_session();
    let ticket = session.open_detail(&GameId::from("g1")).unwrap();
    session.close_overlay(OverlayKind::Detail);
    assert!(!session.commit_reviews(ticket, Ok(library_reviews())));
    assert!(session.reviews().is_none());
}

#[test]
fn review_fetch_failure_can_be_retried() {
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.api().fail("list_reviews");
    session.load_reviews();
    assert_eq!(
        session.reviews().unwrap().load_state(),
        &LoadState::Failed(SERVER_ERROR.into())
    );

    session.api().recover("list_reviews");
    session.load_reviews();
    assert_eq!(session.reviews().unwrap().reviews().len(), 2);
}

#[test]
fn review_form_requires_detail() {
    let mut session = loaded_session();
    assert_eq!(session.open_review_form(None), Err(OverlayError::DetailNotOpen));
}

#[test]
fn new_review_is_added_and_form_closes() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g2")).unwrap();
    session.load_reviews();
    session.open_review_form(None).unwrap();
    assert_eq!(session.review_form().unwrap().controller.draft().rating, 3);

    session
        .edit_review_draft(|d| {
            d.rating = 5;
            d.body = "One more run".into();
            d.hours_played = "80".into();
        })
        .unwrap();
    session.submit_review(now).unwrap();

    let payload = session.api().last_review_payload().unwrap();
    assert_eq!(payload.game_id, GameId::from("g2"));
    assert_eq!(payload.hours_played, 80);
    assert!(payload.updated_at.is_none());

    let panel = session.reviews().unwrap();
    assert_eq!(panel.reviews().len(), 2);
    assert_eq!(panel.reviews()[0].body.as_deref(), Some("One more run"));

    session.tick(now + Duration::from_secs(1));
    assert_eq!(session.overlays().open_kinds(), vec![OverlayKind::Detail]);
    assert!(session.review_form().is_none());
}

#[test]
fn edited_review_is_replaced_and_stamped() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.load_reviews();

    session.open_review_form(Some(&ReviewId::from("r3"))).unwrap();
    assert_eq!(session.review_form().unwrap().controller.draft().hours_played, "20");
    session.edit_review_draft(|d| d.rating = 1).unwrap();
    session.submit_review(now).unwrap();

    assert!(session.api().last_review_payload().unwrap().updated_at.is_some());
    let panel = session.reviews().unwrap();
    let review_ids: Vec<_> = panel.reviews().iter().map(|r| r.id.0.as_str()).collect();
    assert_eq!(review_ids, vec!["r1", "r3"]);
    assert_eq!(panel.get(&ReviewId::from("r3")).unwrap().rating, 1);
}

#[test]
fn review_delete_waits_for_confirmation() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.load_reviews();

    session.request_review_delete(ReviewId::from("r1")).unwrap();
    session.cancel_review_delete();
    assert!(!session.confirm_review_delete(now).unwrap());
    assert_eq!(session.api().calls("delete_review"), 0);

    session.request_review_delete(ReviewId::from("r1")).unwrap();
    assert!(session.confirm_review_delete(now).unwrap());
    assert_eq!(session.reviews().unwrap().reviews().len(), 1);
}

#[test]
fn failed_review_delete_keeps_review() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.load_reviews();
    session.api().fail("delete_review");

    session.request_review_delete(ReviewId::from("r1")).unwrap();
    assert!(session.confirm_review_delete(now).is_err());
    let panel = session.reviews().unwrap();
    assert_eq!(panel.reviews().len(), 2);
    assert_eq!(panel.notice().unwrap().text, SERVER_ERROR);

    session.tick(now + Duration::from_secs(3));
    assert!(session.reviews().unwrap().notice().is_none());
}

#[test]
fn review_delete_answered_after_switching_games_leaves_new_panel_alone() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.load_reviews();
    session.request_review_delete(ReviewId::from("r1")).unwrap();
    let delete = session.begin_review_delete().unwrap();
    assert_eq!(delete.id, ReviewId::from("r1"));
    assert!(session.begin_review_delete().is_none());

    session.open_detail(&GameId::from("g2")).unwrap();
    session.load_reviews();
    let failure = ApiError::Status { status: 500, message: Some(SERVER_ERROR.into()) };
    assert!(session.complete_review_delete(&delete, now, Err(failure)).is_err());

    let panel = session.reviews().unwrap();
    assert_eq!(panel.game_id(), &GameId::from("g2"));
    assert_eq!(panel.reviews().len(), 1);
    assert!(panel.notice().is_none());
}

// ---------------------------------------------------------------------------
// Delete game
// ---------------------------------------------------------------------------

#[test]
fn deleting_a_game_closes_its_overlays() {
    let now = Instant::now();
    let mut session = loaded_session();
    let id = GameId::from("g1");
    session.open_detail(&id).unwrap();
    session.open_edit(&id).unwrap();

    session.delete_game(&id, now).unwrap();
    assert!(!session.overlays().any_open());
    assert!(!session.overlays().scroll_lock().is_locked());
    assert!(session.edit_form().is_none());
    assert!(session.reviews().is_none());
    assert_eq!(ids(session.games()), vec!["g2", "g3"]);
    assert_eq!(session.statistics().total, 2);
    assert_eq!(session.genre_options(), ["Metroidvania", "Roguelike"]);
}

#[test]
fn deleting_another_game_keeps_overlays() {
    let mut session = loaded_session();
    session.open_detail(&GameId::from("g1")).unwrap();
    session.delete_game(&GameId::from("g3"), Instant::now()).unwrap();
    assert!(session.overlays().is_open(OverlayKind::Detail));
}

#[test]
fn failed_delete_shows_notice_on_the_card() {
    let now = Instant::now();
    let mut session = loaded_session();
    session.api().fail("delete_game");

    let err = session.delete_game(&GameId::from("g2"), now).unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert_eq!(session.games().len(), 3);
    let notice = session.notice().unwrap();
    assert_eq!(notice.game_id, GameId::from("g2"));
    assert_eq!(notice.feedback.text, SERVER_ERROR);

    session.tick(now + Duration::from_secs(4));
    assert!(session.notice().is_none());
}

#[test]
fn game_delete_in_flight_is_not_sent_twice() {
    let now = Instant::now();
    let mut session = loaded_session();
    let id = GameId::from("g3");

    assert!(session.begin_game_delete(&id));
    assert!(!session.begin_game_delete(&id));
    session.delete_game(&id, now).unwrap();
    assert_eq!(session.api().calls("delete_game"), 0);
    assert_eq!(session.deleting_games(), [id.clone()]);

    session.complete_game_delete(&id, now, Ok(())).unwrap();
    assert!(session.deleting_games().is_empty());
    assert_eq!(ids(session.games()), vec!["g1", "g2"]);
}
