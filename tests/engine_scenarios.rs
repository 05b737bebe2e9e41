//! End-to-end behaviour of the player against the silent backend and the
//! scripted prober.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::mpsc::Receiver;

use sonora_engine::core::metadata::{ProbeEvent, ProbeHandle, ProbeSink, Prober};
use sonora_engine::core::playback::BackendState;
use sonora_engine::core::types::NANOS_PER_SEC;
use sonora_engine::{
    Error, HookEvent, HookOutcome, Notification, NullFactory, Player, PlayerOptions,
    PlayerState, ScriptedProber, SeekFormat, Stream, hook,
};

struct Rig {
    player: Player,
    factory: NullFactory,
    prober: ScriptedProber,
    events: Receiver<Notification>,
}

fn rig() -> Rig {
    let factory = NullFactory::new();
    let prober = ScriptedProber::new();
    let mut player = Player::new(
        Box::new(factory.clone()),
        Box::new(prober.clone()),
        PlayerOptions {
            seed: Some(42),
            ..PlayerOptions::default()
        },
    );
    let events = player.subscribe();
    Rig {
        player,
        factory,
        prober,
        events,
    }
}

fn fill(r: &mut Rig, n: usize) {
    for i in 0..n {
        r.player
            .insert_uri(&format!("file:///music/{i}.mp3"), None)
            .unwrap();
    }
    settle(&mut r.player);
    r.events.try_iter().for_each(drop);
}

fn settle(p: &mut Player) {
    for _ in 0..100 {
        if !p.dispatch() {
            return;
        }
    }
}

#[test]
fn first_insert_selects_it() {
    let mut r = rig();
    r.player.insert_uri("file:///a.mp3", None).unwrap();

    assert_eq!(r.player.current(), Some(0));
    assert_eq!(r.player.total(), 1);

    let changes: Vec<_> = r
        .events
        .try_iter()
        .filter_map(|n| match n {
            Notification::Change { from, to } => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![(None, Some(0))]);
}

#[test]
fn no_next_at_end_without_repeat() {
    let mut r = rig();
    fill(&mut r, 3);
    r.player.go_to(Some(2)).unwrap();

    assert_eq!(r.player.get_next(), None);
    assert!(!r.player.can_go_next());
}

#[test]
fn queued_item_comes_next() {
    let mut r = rig();
    fill(&mut r, 3);

    r.player.queue(1).unwrap();
    assert_eq!(r.player.get_next(), Some(1));
}

#[test]
fn hook_can_swallow_insert() {
    let mut r = rig();
    fill(&mut r, 2);
    r.player.hook_add(hook(|e: &HookEvent| match e {
        HookEvent::Insert { .. } => HookOutcome::Handled,
        _ => HookOutcome::Continue,
    }));

    r.player.insert_uri("file:///extra.mp3", None).unwrap();
    assert_eq!(r.player.total(), 2);
    assert!(!r
        .events
        .try_iter()
        .any(|n| matches!(n, Notification::Insert { .. })));
}

#[test]
fn seek_without_stream_fails_silently() {
    let mut r = rig();
    let res = r.player.seek(SeekFormat::Time, 5 * NANOS_PER_SEC);

    assert!(matches!(res, Err(Error::NoStream)));
    assert!(!r
        .events
        .try_iter()
        .any(|n| matches!(n, Notification::Seek { .. })));
}

#[test]
fn following_get_next_lands_on_it_and_falls_off_the_end() {
    let mut r = rig();
    fill(&mut r, 4);

    let mut visited = Vec::new();
    while let Some(next) = r.player.get_next() {
        r.player.go_to(Some(next)).unwrap();
        assert_eq!(r.player.current(), Some(next));
        visited.push(next);
        if visited.len() > 10 {
            break;
        }
    }
    assert_eq!(visited, vec![1, 2, 3]);

    r.player.go_to(r.player.get_next()).unwrap();
    assert_eq!(r.player.current(), None);
}

#[test]
fn random_walk_covers_every_item() {
    let mut r = rig();
    fill(&mut r, 8);
    r.player.set_random(true).unwrap();
    r.player.go_to(None).unwrap();

    let mut seen = HashSet::new();
    while let Some(next) = r.player.get_next() {
        assert!(seen.insert(next), "visited {next} twice");
        r.player.go_to(Some(next)).unwrap();
    }
    assert_eq!(seen.len(), 8);
}

#[test]
fn adding_then_removing_a_hook_changes_nothing() {
    let mut r = rig();
    fill(&mut r, 2);

    let calls = Rc::new(RefCell::new(0));
    let c = Rc::clone(&calls);
    let h = hook(move |_: &HookEvent| {
        *c.borrow_mut() += 1;
        HookOutcome::Blocked
    });
    r.player.hook_add(Rc::clone(&h));
    assert!(r.player.hook_remove(&h));

    r.player.play().unwrap();
    r.player.go_to(Some(1)).unwrap();
    assert_eq!(*calls.borrow(), 0);
    assert_eq!(r.player.state(), PlayerState::Play);
}

/// Hands every probe sink back to the test so it decides when probes finish.
#[derive(Clone, Default)]
struct HeldProber {
    sinks: Rc<RefCell<Vec<ProbeSink>>>,
}

struct NoDuration;

impl ProbeHandle for NoDuration {
    fn duration(&self) -> Option<i64> {
        None
    }
}

impl Prober for HeldProber {
    fn probe(&self, _uri: &str, sink: ProbeSink) -> sonora_engine::Result<Box<dyn ProbeHandle>> {
        self.sinks.borrow_mut().push(sink);
        Ok(Box::new(NoDuration))
    }
}

#[test]
fn resubmitting_during_probe_completes_once() {
    let prober = HeldProber::default();
    let mut player = Player::new(
        Box::new(NullFactory::new()),
        Box::new(prober.clone()),
        PlayerOptions::default(),
    );
    let events = player.subscribe();

    let stream = Stream::new("file:///slow.mp3").unwrap().shared();
    player.insert(Rc::clone(&stream), None).unwrap();
    settle(&mut player);
    assert!(player.parser().in_flight().is_some());

    // Same stream again while its probe is running.
    player.insert(Rc::clone(&stream), None).unwrap();
    settle(&mut player);
    assert_eq!(prober.sinks.borrow().len(), 1);
    assert_eq!(player.parser().pending(), 0);

    let sink = prober.sinks.borrow()[0].clone();
    sink.send(ProbeEvent::StateChanged {
        old: BackendState::Ready,
        new: BackendState::Paused,
    });
    sink.send(ProbeEvent::NewClock);
    settle(&mut player);

    let all_tags = events
        .try_iter()
        .filter(|n| matches!(n, Notification::AllTags { stream: s } if Rc::ptr_eq(s, &stream)))
        .count();
    assert_eq!(all_tags, 1);
    assert!(stream.all_tags());
    assert_eq!(prober.sinks.borrow().len(), 1);
    assert!(player.parser().is_idle());
}

#[test]
fn volume_minus_one_without_backend_is_silent() {
    let mut r = rig();
    r.player.set_volume(-1).unwrap();
    assert_eq!(r.player.volume(), 50);
    assert_eq!(r.events.try_iter().count(), 0);
}

#[test]
fn playing_through_a_playlist() {
    let mut r = rig();
    r.prober
        .script_tags("file:///music/0.mp3", &[("artist", "Nina"), ("title", "Intro")]);
    r.prober.set_duration("file:///music/0.mp3", 90 * NANOS_PER_SEC);
    fill(&mut r, 2);

    let first = r.player.current_stream().unwrap();
    assert_eq!(first.expand("%a - %t"), "Nina - Intro");
    assert_eq!(first.length(), 90 * NANOS_PER_SEC);

    r.player.play().unwrap();
    r.factory.finish();
    settle(&mut r.player);
    assert!(r
        .events
        .try_iter()
        .any(|n| matches!(n, Notification::Eos { .. })));

    r.player.go_next().unwrap();
    assert_eq!(r.player.current(), Some(1));
    assert_eq!(r.player.state(), PlayerState::Play);
    assert_eq!(r.factory.device().unwrap().uri, "file:///music/1.mp3");
}

#[test]
fn blocked_operations_report_the_hook() {
    let mut r = rig();
    fill(&mut r, 2);
    r.player.hook_add(hook(|e: &HookEvent| match e {
        HookEvent::Remove { .. } | HookEvent::Clear => HookOutcome::Blocked,
        _ => HookOutcome::Continue,
    }));

    assert!(matches!(r.player.remove(0), Err(Error::BlockedByHook("remove"))));
    assert!(matches!(r.player.clear(), Err(Error::BlockedByHook("clear"))));
    assert_eq!(r.player.total(), 2);
}

#[test]
fn random_walk_with_a_stream_listed_twice() {
    let mut r = rig();
    let a = Stream::new("file:///music/a.mp3").unwrap().shared();
    r.player.insert(Rc::clone(&a), None).unwrap();
    r.player.insert_uri("file:///music/b.mp3", None).unwrap();
    r.player.insert(Rc::clone(&a), None).unwrap();
    settle(&mut r.player);
    r.player.set_random(true).unwrap();
    r.player.go_to(None).unwrap();

    let mut visited = Vec::new();
    while let Some(next) = r.player.get_next() {
        r.player.go_to(Some(next)).unwrap();
        visited.push(next);
        assert!(visited.len() <= 3, "walk did not end: {visited:?}");
    }
    visited.sort_unstable();
    assert_eq!(visited, vec![0, 1, 2]);
}
