//! Conversation lifecycle: turns, social gain, fallbacks, claims.

mod common;

use std::sync::Arc;

use common::{Broken, Scripted, Stalled, harness, meadow, quick_conversations, villager};
use hamlet_core::memory::Quality;
use hamlet_core::{ConversationPhase, HamletError, MessageKind, Needs, Position, ResourceKind};
use hamlet_sim::SimEvent;

fn two_villagers() -> (hamlet_core::World, hamlet_core::CharacterId, hamlet_core::CharacterId) {
    let mut world = meadow(10, 10);
    let a = villager(&mut world, "Ahmet", Needs::new(80.0, 80.0, 80.0, 50.0), Position::new(2, 2));
    let b = villager(&mut world, "Ayşe", Needs::new(80.0, 80.0, 80.0, 50.0), Position::new(3, 2));
    (world, a, b)
}

#[tokio::test]
async fn four_turns_alternate_and_raise_social_by_ten() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Scripted::new(&[]), quick_conversations(4));

    let started = h.orchestrator.start(a, b).expect("claim");
    assert!(h.world.read().character(a).expect("a").in_conversation());
    let phase = started.task.await.expect("join");
    assert_eq!(phase, ConversationPhase::Done);

    let convo = h.orchestrator.conversation(started.id).expect("registered");
    assert_eq!(convo.messages.len(), 4);
    let speakers: Vec<_> = convo.messages.iter().map(|m| m.speaker_id).collect();
    assert_eq!(speakers, [Some(a), Some(b), Some(a), Some(b)]);
    assert!(convo.messages.iter().all(|m| m.kind == MessageKind::Character));

    let world = h.world.read();
    for id in [a, b] {
        let c = world.character(id).expect("character");
        assert!((c.needs.social() - 60.0).abs() < 1e-4, "social {}", c.needs.social());
        assert!(!c.in_conversation());
        assert!(c.conversation_target().is_none());
    }
    assert!(h.orchestrator.active_conversations().is_empty());
}

#[tokio::test]
async fn social_gain_is_capped() {
    let mut world = meadow(10, 10);
    let a = villager(&mut world, "Ahmet", Needs::new(80.0, 80.0, 80.0, 98.0), Position::new(2, 2));
    let b = villager(&mut world, "Ayşe", Needs::new(80.0, 80.0, 80.0, 98.0), Position::new(3, 2));
    let h = harness(world, Scripted::new(&[]), quick_conversations(5));

    h.orchestrator.start(a, b).expect("claim").task.await.expect("join");
    let world = h.world.read();
    for id in [a, b] {
        assert!((world.character(id).expect("c").needs.social() - 100.0).abs() < f32::EPSILON);
    }
}

#[tokio::test]
async fn failing_generator_releases_with_fallback() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Broken, quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    assert_eq!(started.task.await.expect("join"), ConversationPhase::Failed);

    let world = h.world.read();
    for id in [a, b] {
        let c = world.character(id).expect("c");
        assert!(!c.in_conversation());
        assert!((c.needs.social() - 53.0).abs() < 1e-4);
        let last = c.memory.recent(1);
        assert!(last[0].content.ends_with("ile kısa bir etkileşim"));
    }
    let convo = h.orchestrator.conversation(started.id).expect("registered");
    assert!(convo.messages.is_empty());
    assert_eq!(convo.phase, ConversationPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn stalled_generator_times_out() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Stalled, quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    assert_eq!(started.task.await.expect("join"), ConversationPhase::Failed);
    assert!(!h.world.read().character(b).expect("b").in_conversation());
}

#[tokio::test]
async fn aborted_conversation_still_releases_claim() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Stalled, quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    started.task.abort();
    assert!(started.task.await.is_err());
    let world = h.world.read();
    assert!(!world.character(a).expect("a").in_conversation());
    assert!(!world.character(b).expect("b").in_conversation());
}

#[tokio::test]
async fn aborted_conversation_is_closed_out() {
    let (world, a, b) = two_villagers();
    let mut h = harness(world, Stalled, quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    tokio::task::yield_now().await;
    started.task.abort();
    assert!(started.task.await.is_err());

    let convo = h.orchestrator.conversation(started.id).expect("registered");
    assert_eq!(convo.phase, ConversationPhase::Failed);
    assert!(h.orchestrator.active_conversations().is_empty());
    assert!(h.orchestrator.cooldowns().last(a).is_some());
    assert!(h.orchestrator.cooldowns().last(b).is_some());
    let err = h
        .orchestrator
        .send_user_message(started.id, "hâlâ orada mısınız?")
        .expect_err("closed");
    assert!(matches!(err, HamletError::ConversationClosed(_)));

    let mut ended = None;
    while let Ok(event) = h.events.try_recv() {
        if let SimEvent::ConversationEnded { conversation_id, phase } = event {
            ended = Some((conversation_id, phase));
        }
    }
    assert_eq!(ended, Some((started.id, ConversationPhase::Failed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initiators_yield_one_winner() {
    let mut world = meadow(10, 10);
    let target = villager(&mut world, "Fatma", Needs::default(), Position::new(5, 5));
    let initiators: Vec<_> = (0..6)
        .map(|i| villager(&mut world, "Köylü", Needs::default(), Position::new(i, 0)))
        .collect();
    let h = Arc::new(harness(world, Stalled, quick_conversations(3)));

    let attempts: Vec<_> = initiators
        .iter()
        .map(|&id| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.orchestrator.start(id, target) })
        })
        .collect();

    let mut winners = Vec::new();
    for attempt in attempts {
        match attempt.await.expect("join") {
            Ok(started) => winners.push(started),
            Err(e) => assert!(matches!(e, HamletError::ConversationClaim { .. })),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(h.orchestrator.active_conversations().len(), 1);

    for started in winners {
        started.task.abort();
        let _ = started.task.await;
    }
    assert!(!h.world.read().character(target).expect("t").in_conversation());
}

#[tokio::test]
async fn cooldown_blocks_immediate_rematch() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Scripted::new(&[]), quick_conversations(3));

    h.orchestrator.start(a, b).expect("claim").task.await.expect("join");
    assert!(h.orchestrator.cooldowns().last(a).is_some());
    let err = h.orchestrator.start(b, a).expect_err("cooling down");
    assert!(matches!(err, HamletError::ConversationClaim { .. }));
}

#[tokio::test]
async fn listener_learns_shared_resource() {
    let (world, a, b) = two_villagers();
    let script = Scripted::new(&["Merhaba Ayşe! Göl kenarında (7, 3) temiz su buldum."]);
    let h = harness(world, script, quick_conversations(3));

    h.orchestrator.start(a, b).expect("claim").task.await.expect("join");

    let world = h.world.read();
    let ayse = world.character(b).expect("b");
    let water = ayse.memory.known_resources(Some(ResourceKind::Water));
    assert_eq!(water.len(), 1);
    assert_eq!(water[0].position(), Position::new(7, 3));
    assert_eq!(water[0].quality, Quality::Shared);
    assert_eq!(water[0].source.as_deref(), Some("Ahmet"));
    assert_eq!(water[0].times_visited, 0);
    // Resource plus general knowledge ("buldum").
    assert_eq!(ayse.memory.long_term().shared_information.len(), 2);

    let ahmet = world.character(a).expect("a");
    assert!(ahmet.memory.known_resources(Some(ResourceKind::Water)).is_empty());
}

#[tokio::test]
async fn coordinates_off_the_map_are_not_learned() {
    let (world, a, b) = two_villagers();
    let script = Scripted::new(&["Uzakta (70, 3) bir göl var, su orada."]);
    let h = harness(world, script, quick_conversations(3));

    h.orchestrator.start(a, b).expect("claim").task.await.expect("join");

    let world = h.world.read();
    let ayse = world.character(b).expect("b");
    assert!(ayse.memory.known_resources(None).is_empty());
    assert!(ayse.memory.long_term().shared_information.is_empty());
}

#[tokio::test]
async fn user_messages_only_reach_open_conversations() {
    let (world, a, b) = two_villagers();
    let mut h = harness(world, Stalled, quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    let message = h
        .orchestrator
        .send_user_message(started.id, "Merhaba köylüler")
        .expect("open");
    assert_eq!(message.kind, MessageKind::User);
    assert!(message.speaker_id.is_none());

    let mut saw_user_message = false;
    while let Ok(event) = h.events.try_recv() {
        if let SimEvent::NewMessage { message, .. } = event {
            saw_user_message |= message.content == "Merhaba köylüler";
        }
    }
    assert!(saw_user_message);

    started.task.abort();
    let _ = started.task.await;

    let unknown = h
        .orchestrator
        .send_user_message(hamlet_core::ConversationId::new(), "kimse yok mu?")
        .expect_err("unknown");
    assert!(matches!(unknown, HamletError::ConversationNotFound(_)));
}

#[tokio::test]
async fn finished_conversation_rejects_user_messages() {
    let (world, a, b) = two_villagers();
    let h = harness(world, Scripted::new(&[]), quick_conversations(3));

    let started = h.orchestrator.start(a, b).expect("claim");
    started.task.await.expect("join");
    let err = h
        .orchestrator
        .send_user_message(started.id, "geç kaldım")
        .expect_err("closed");
    assert!(matches!(err, HamletError::ConversationClosed(_)));
    assert_eq!(h.orchestrator.history().len(), 1);
}

#[tokio::test]
async fn lifecycle_is_broadcast() {
    let (world, a, b) = two_villagers();
    let mut h = harness(world, Scripted::new(&[]), quick_conversations(3));

    h.orchestrator.start(a, b).expect("claim").task.await.expect("join");

    let mut kinds = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        kinds.push(match event {
            SimEvent::ConversationStarted { .. } => "started",
            SimEvent::NewMessage { .. } => "message",
            SimEvent::ConversationEnded { phase, .. } => {
                assert_eq!(phase, ConversationPhase::Done);
                "ended"
            }
            _ => "other",
        });
    }
    assert_eq!(kinds, ["started", "message", "message", "message", "ended"]);
}
