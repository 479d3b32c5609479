use chrono::{DateTime, Duration, Utc};
use expedition_engine::{
    EngineConfig, ExpeditionError, ExpeditionOption, ExpeditionService, ExpeditionStatus,
    FoodType, GuildFoodStock, InMemoryPorts, LogAction, MapLink, MapLocation, OutcomeKind,
    PetDiet, PetSnapshot, PetSpecies, PlayerSnapshot, StatusReport, WritePath,
};

const PLAYER: u64 = 7;
const PET: u64 = 70;
const GUILD: u64 = 3;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-09-14T18:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn player(guild_id: Option<u64>) -> PlayerSnapshot {
    PlayerSnapshot {
        id: PLAYER,
        has_talisman: true,
        has_clone_talisman: false,
        on_continent: true,
        guild_id,
        current_link: MapLink {
            id: 12,
            start: MapLocation::new(120, "fo"),
            end: MapLocation::new(121, "be"),
        },
    }
}

fn pet(love_points: u32) -> PetSnapshot {
    PetSnapshot {
        id: PET,
        type_id: 1,
        love_points,
        feed_cooldown: Duration::days(2),
    }
}

fn world(guild_stock: Option<GuildFoodStock>) -> InMemoryPorts {
    let mut ports = InMemoryPorts::new(t0())
        .with_player(player(guild_stock.map(|_| GUILD)))
        .with_pet(PLAYER, pet(200))
        .with_species(PetSpecies {
            type_id: 1,
            force: 10,
            speed: 20,
            diet: PetDiet::Carnivorous,
        })
        .with_distant_locations(vec![
            MapLocation::new(300, "ru"),
            MapLocation::new(301, "ca"),
            MapLocation::new(302, "ma"),
        ]);
    if let Some(stock) = guild_stock {
        ports = ports.with_guild(GUILD, stock);
    }
    ports
}

fn service(seed: u64, guild_stock: Option<GuildFoodStock>) -> ExpeditionService<InMemoryPorts> {
    init_logging();
    ExpeditionService::with_seed(world(guild_stock), EngineConfig::default(), seed)
}

fn proposals(service: &ExpeditionService<InMemoryPorts>) -> Vec<ExpeditionOption> {
    match service.check_status(PLAYER).unwrap() {
        StatusReport::Proposals { options } => options,
        other => panic!("expected proposals, got {other:?}"),
    }
}

fn advance(service: &ExpeditionService<InMemoryPorts>, by: Duration) {
    service.ports().fixed_clock().advance(by);
}

#[test]
fn full_expedition_round_trip() {
    let service = service(11, None);
    let options = proposals(&service);
    assert_eq!(options.len(), 3);
    let short = &options[0];

    let started = service.select_option(PLAYER, short.id).unwrap();
    let expedition_id = started.expedition.id;
    assert_eq!(started.expedition.status, ExpeditionStatus::InProgress);
    assert_eq!(started.expedition.duration_minutes(), short.duration_minutes);
    assert_eq!(started.expedition.food_consumed, None);

    match service.check_status(PLAYER).unwrap() {
        StatusReport::InProgress {
            expedition,
            remaining_minutes,
            ready_to_complete,
        } => {
            assert_eq!(expedition.id, expedition_id);
            assert_eq!(remaining_minutes, i64::from(short.duration_minutes));
            assert!(!ready_to_complete);
        }
        other => panic!("expected in-progress status, got {other:?}"),
    }

    advance(&service, Duration::minutes(i64::from(short.duration_minutes) - 1));
    let early = service.complete(PLAYER).unwrap_err();
    assert_eq!(
        early.rule(),
        Some(ExpeditionError::ExpeditionNotComplete {
            remaining_minutes: 1
        })
    );

    advance(&service, Duration::minutes(1));
    let love_before = service.ports().pet_snapshot(PLAYER).unwrap().love_points;
    let done = service.complete(PLAYER).unwrap();
    let outcome = done.outcome.unwrap();
    assert_eq!(done.expedition.status, ExpeditionStatus::Completed);
    assert_eq!(
        service.ports().expedition(expedition_id).map(|row| row.status),
        Some(ExpeditionStatus::Completed)
    );
    assert_eq!(service.ports().scheduled_notification(expedition_id), None);

    let love_after = service.ports().pet_snapshot(PLAYER).unwrap().love_points;
    assert_eq!(
        i64::from(love_after) - i64::from(love_before),
        i64::from(outcome.love_change)
    );

    let wallet = service.ports().wallet(PLAYER);
    match outcome.rewards {
        Some(rewards) => {
            assert_eq!(wallet.money, rewards.money);
            assert_eq!(wallet.experience, rewards.experience);
            assert_eq!(wallet.score, rewards.points);
            assert_eq!(wallet.tokens, rewards.tokens);
            assert_eq!(wallet.items, vec![rewards.item]);
            assert_eq!(service.ports().badge_total(PLAYER), 1);
        }
        None => {
            assert_eq!(outcome.kind(), OutcomeKind::TotalFailure);
            assert_eq!(wallet.money, 0);
            assert_eq!(service.ports().badge_total(PLAYER), 0);
        }
    }

    let actions: Vec<LogAction> = service
        .ports()
        .log_entries()
        .iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(actions, vec![LogAction::Started, LogAction::Completed]);

    let again = service.complete(PLAYER).unwrap_err();
    assert_eq!(again.rule(), Some(ExpeditionError::NoExpedition));
}

#[test]
fn only_one_expedition_at_a_time() {
    let service = service(5, None);
    let options = proposals(&service);
    service.select_option(PLAYER, options[1].id).unwrap();

    // A second tab still holding the old proposal set.
    let stale = service.select_option(PLAYER, options[2].id).unwrap_err();
    assert_eq!(stale.rule(), Some(ExpeditionError::InvalidState));
    assert!(matches!(
        service.check_status(PLAYER).unwrap(),
        StatusReport::InProgress { .. }
    ));

    service.recall(PLAYER).unwrap();
    let fresh = proposals(&service);
    service.select_option(PLAYER, fresh[0].id).unwrap();
}

#[test]
fn guild_food_is_consumed_at_selection() {
    let stock = GuildFoodStock {
        treats: 2,
        meat: 3,
        salad: 40,
        soup: 1,
    };
    let service = service(23, Some(stock));
    let options = proposals(&service);
    let long = &options[2];
    let started = service.select_option(PLAYER, long.id).unwrap();

    let after = service.ports().guild_stock(GUILD).unwrap();
    assert_eq!(after.salad, 40, "carnivores never touch salad");
    let rations_used = (stock.treats - after.treats) * FoodType::Treat.rations()
        + (stock.meat - after.meat) * FoodType::Meat.rations()
        + (stock.soup - after.soup) * FoodType::Soup.rations();
    assert_eq!(started.expedition.food_consumed, Some(rations_used));
    assert!(rations_used >= long.food_cost.min(2 + 9 + 5));

    let log = service.ports().log_entries();
    assert_eq!(log[0].food_consumed, Some(rations_used));
}

#[test]
fn empty_guild_still_starts_but_records_shortfall() {
    let service = service(31, Some(GuildFoodStock::default()));
    let options = proposals(&service);
    let started = service.select_option(PLAYER, options[0].id).unwrap();
    assert_eq!(started.expedition.food_consumed, Some(0));
    assert_eq!(
        service.ports().guild_stock(GUILD),
        Some(GuildFoodStock::default())
    );
}

#[test]
fn scheduler_outage_after_food_is_taken_resumes_without_double_spend() {
    let stock = GuildFoodStock {
        treats: 30,
        meat: 10,
        salad: 0,
        soup: 5,
    };
    let service = service(41, Some(stock));
    let options = proposals(&service);
    service
        .ports()
        .set_offline(WritePath::Notifications, true);

    let pending = service
        .select_option(PLAYER, options[1].id)
        .unwrap_err()
        .into_pending()
        .unwrap();
    let expedition_id = pending.expedition_id();
    let after_food = service.ports().guild_stock(GUILD).unwrap();
    assert_ne!(after_food, stock);
    assert_eq!(
        service.ports().expedition(expedition_id).map(|row| row.status),
        Some(ExpeditionStatus::InProgress)
    );
    assert!(service.ports().log_entries().is_empty());

    service
        .ports()
        .set_offline(WritePath::Notifications, false);
    let started = service.resume_effects(pending).unwrap();
    assert_eq!(service.ports().guild_stock(GUILD), Some(after_food));
    assert_eq!(
        service.ports().scheduled_notification(expedition_id),
        Some(started.expedition.end_date)
    );
    assert_eq!(service.ports().log_entries().len(), 1);
}

#[test]
fn love_store_outage_leaves_expedition_running() {
    let service = service(17, None);
    let options = proposals(&service);
    let started = service.select_option(PLAYER, options[0].id).unwrap();
    advance(&service, Duration::days(1));
    service.ports().set_offline(WritePath::Love, true);

    assert!(service.complete(PLAYER).unwrap_err().rule().is_none());
    assert_eq!(
        service
            .ports()
            .expedition(started.expedition.id)
            .map(|row| row.status),
        Some(ExpeditionStatus::InProgress)
    );

    service.ports().set_offline(WritePath::Love, false);
    let done = service.complete(PLAYER).unwrap();
    assert_eq!(done.expedition.status, ExpeditionStatus::Completed);
}

#[test]
fn cancel_and_recall_penalties_escalate_within_the_week() {
    let service = service(3, None);
    let love = || service.ports().pet_snapshot(PLAYER).unwrap().love_points;

    for expected_loss in [0, 10, 20] {
        let options = proposals(&service);
        service.select_option(PLAYER, options[0].id).unwrap();
        advance(&service, Duration::minutes(1));
        let before = love();
        service.cancel(PLAYER).unwrap();
        assert_eq!(before - love(), expected_loss);
    }

    let options = proposals(&service);
    service.select_option(PLAYER, options[1].id).unwrap();
    advance(&service, Duration::minutes(30));
    let before = love();
    service.recall(PLAYER).unwrap();
    assert_eq!(before - love(), 45);

    // Outside the trailing window the slate is clean again.
    advance(&service, Duration::days(8));
    let options = proposals(&service);
    service.select_option(PLAYER, options[0].id).unwrap();
    let before = love();
    service.recall(PLAYER).unwrap();
    assert_eq!(before, love());
}

#[test]
fn cancel_after_departure_requires_recall() {
    let service = service(9, None);
    let options = proposals(&service);
    service.select_option(PLAYER, options[0].id).unwrap();
    advance(&service, Duration::minutes(5));

    let err = service.cancel(PLAYER).unwrap_err();
    assert_eq!(err.rule(), Some(ExpeditionError::AlreadyDeparted));
    let recalled = service.recall(PLAYER).unwrap();
    assert_eq!(recalled.expedition.status, ExpeditionStatus::Recalled);
    assert_eq!(
        service.cancel(PLAYER).unwrap_err().rule(),
        Some(ExpeditionError::NoExpedition)
    );
}

#[test]
fn prerequisites_block_generation() {
    let service = service(1, None);

    service
        .ports()
        .update_pet(PLAYER, |pet| pet.feed_cooldown = Duration::zero());
    assert_eq!(
        service.check_status(PLAYER).unwrap_err().rule(),
        Some(ExpeditionError::PetHungry)
    );

    service.ports().update_pet(PLAYER, |pet| {
        pet.feed_cooldown = Duration::hours(1);
        pet.love_points = 12;
    });
    assert_eq!(
        service.check_status(PLAYER).unwrap_err().rule(),
        Some(ExpeditionError::InsufficientLove {
            love: 12,
            required: 80
        })
    );

    service.ports().update_pet(PLAYER, |pet| pet.love_points = 90);
    service
        .ports()
        .update_player(PLAYER, |player| player.on_continent = false);
    assert_eq!(
        service.check_status(PLAYER).unwrap_err().rule(),
        Some(ExpeditionError::NotOnContinent)
    );

    service
        .ports()
        .update_player(PLAYER, |player| player.has_talisman = false);
    assert_eq!(
        service.check_status(PLAYER).unwrap_err().rule(),
        Some(ExpeditionError::NoTalisman)
    );
}

#[test]
fn missing_expedition_is_reported_for_every_command() {
    let service = service(2, None);
    for result in [
        service.cancel(PLAYER),
        service.recall(PLAYER),
        service.complete(PLAYER),
    ] {
        assert_eq!(
            result.unwrap_err().rule(),
            Some(ExpeditionError::NoExpedition)
        );
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let run = |seed| {
        let service = service(seed, None);
        let options = proposals(&service);
        service.select_option(PLAYER, options[2].id).unwrap();
        advance(&service, Duration::days(3));
        let done = service.complete(PLAYER).unwrap();
        (options, done.outcome)
    };
    assert_eq!(run(77), run(77));
}

#[test]
fn badge_sink_tracks_cumulative_successes() {
    let service = service(101, None);
    for _ in 0..6 {
        let options = proposals(&service);
        service.select_option(PLAYER, options[0].id).unwrap();
        advance(&service, Duration::hours(4));
        service.complete(PLAYER).unwrap();
        service
            .ports()
            .update_pet(PLAYER, |pet| pet.love_points = pet.love_points.max(100));
    }

    let successes = service
        .ports()
        .log_entries()
        .iter()
        .filter(|entry| {
            entry.action == LogAction::Completed
                && entry.outcome != Some(OutcomeKind::TotalFailure)
        })
        .count();
    assert_eq!(
        service.ports().badge_total(PLAYER),
        u32::try_from(successes).unwrap()
    );
    assert!(!service.ports().has_expedition_badge(PLAYER));
}
