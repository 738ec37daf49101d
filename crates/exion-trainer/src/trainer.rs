//! The self-play orchestrator.
//!
//! One training run is the loop `INIT → (PLAY_GAME → [EXPAND_FEATURES] →
//! [UPDATE_WEIGHTS]*)* → FINALIZE`: games are played to completion with the
//! expert, experience is harvested into per-player replay buffers, weight
//! updates run every `update_weights_every` actions, and every
//! `add_feature_every` games the feature-discovery engine runs once per
//! player on a parallel worker pool. Loop-local state lives in an explicit
//! [`TrainerState`] struct rather than closures, and each phase is its own
//! method.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use exion_discovery::{CorrelationFeatureExpander, ExpansionConfig, FeatureExpander};
use exion_experience::{ExperienceSample, UniformReplayBuffer};
use exion_features::{FeatureSet, GridMatchEngine, MatchEngine as _};
use exion_game::GameRules;
use exion_policy::{LinearPolicy, RmsProp, linear};
use exion_stats::descriptive::DescriptiveStats;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64Mcg;

use crate::{
    annotate::analyse_special_moves,
    checkpoint::{CheckpointCounter, CheckpointError, CheckpointWriter},
    expert::Expert,
    status::FeatureStatusTable,
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrainerError {
    /// Fatal setup error: nothing can be matched, learned or grown.
    #[display("feature set instantiated with zero features")]
    EmptyFeatureSet,
    #[display("checkpoint failed: {_0}")]
    Checkpoint(CheckpointError),
}

/// Training-run configuration.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of self-play games to run.
    pub games: u32,
    /// Run feature discovery every this many games (when growth is on).
    pub add_feature_every: u32,
    /// Run one batched gradient step per player every this many actions.
    pub update_weights_every: u64,
    /// Batch size for gradient updates and discovery alike.
    pub batch_size: usize,
    /// Per-player replay buffer capacity.
    pub replay_capacity: usize,
    /// Expert thinking budget per decision (playouts for the bundled
    /// expert).
    pub thinking_budget: u32,
    pub learning_rate: f32,
    /// Whether the feature vocabulary grows at all.
    pub grow_features: bool,
    pub expansion: ExpansionConfig,
    /// Write checkpoints every this many games; `None` disables them.
    pub checkpoint_every_games: Option<u32>,
    pub checkpoint_counter: CheckpointCounter,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            games: 100,
            add_feature_every: 5,
            update_weights_every: 16,
            batch_size: 32,
            replay_capacity: 4096,
            thinking_budget: 128,
            learning_rate: 0.01,
            grow_features: true,
            expansion: ExpansionConfig::default(),
            checkpoint_every_games: None,
            checkpoint_counter: CheckpointCounter::Games,
            seed: 0,
        }
    }
}

/// Loop-local counters and the latest training diagnostics.
#[derive(Debug, Default)]
pub struct TrainerState {
    pub game_counter: u32,
    pub action_counter: u64,
    pub weight_update_counter: u64,
    /// Cross-entropy losses of the most recent gradient batch.
    pub last_loss_stats: Option<DescriptiveStats>,
}

/// Summary of a finished (or interrupted) run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub games: u32,
    pub actions: u64,
    pub weight_updates: u64,
    pub feature_counts: Vec<usize>,
    pub buffered_samples: Vec<usize>,
    pub interrupted: bool,
}

/// The self-play training loop.
pub struct SelfPlayTrainer<'a> {
    rules: &'a dyn GameRules,
    config: TrainerConfig,
    matcher: GridMatchEngine,
    expander: Box<dyn FeatureExpander>,
    feature_sets: Vec<FeatureSet>,
    policy: LinearPolicy,
    optimiser: RmsProp,
    buffers: Vec<UniformReplayBuffer>,
    status_tables: Vec<FeatureStatusTable>,
    checkpoint: Option<CheckpointWriter>,
    state: TrainerState,
    interrupt: Arc<AtomicBool>,
    rng: Pcg64Mcg,
}

impl<'a> SelfPlayTrainer<'a> {
    /// Sets up a run: every player starts from the same feature set with a
    /// zero policy.
    pub fn new(
        rules: &'a dyn GameRules,
        initial_features: FeatureSet,
        config: TrainerConfig,
    ) -> Result<Self, TrainerError> {
        if initial_features.is_empty() {
            return Err(TrainerError::EmptyFeatureSet);
        }
        let players = usize::from(rules.player_count());
        let feature_count = initial_features.len();
        Ok(Self {
            rules,
            matcher: GridMatchEngine::new(),
            expander: Box::new(CorrelationFeatureExpander::new(config.expansion)),
            feature_sets: vec![initial_features; players],
            policy: LinearPolicy::new(players, feature_count),
            optimiser: RmsProp::new(players, config.learning_rate),
            buffers: vec![UniformReplayBuffer::new(config.replay_capacity); players],
            status_tables: vec![FeatureStatusTable::new(feature_count); players],
            checkpoint: None,
            state: TrainerState::default(),
            interrupt: Arc::new(AtomicBool::new(false)),
            rng: Pcg64Mcg::seed_from_u64(config.seed),
            config,
        })
    }

    /// Replaces the growth policy (used for the alternative expander, and
    /// for orchestration tests).
    #[must_use]
    pub fn with_expander(mut self, expander: Box<dyn FeatureExpander>) -> Self {
        self.expander = expander;
        self
    }

    /// Enables checkpoint files under `dir`.
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: PathBuf) -> Self {
        self.checkpoint = Some(CheckpointWriter::new(dir));
        self
    }

    /// Flag observed between games (and loosely between moves) to stop the
    /// run at the next safe point.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    #[must_use]
    pub fn feature_sets(&self) -> &[FeatureSet] {
        &self.feature_sets
    }

    #[must_use]
    pub fn policy(&self) -> &LinearPolicy {
        &self.policy
    }

    #[must_use]
    pub fn status_tables(&self) -> &[FeatureStatusTable] {
        &self.status_tables
    }

    #[must_use]
    pub fn state(&self) -> &TrainerState {
        &self.state
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Runs the whole training loop.
    pub fn run(&mut self, expert: &mut dyn Expert) -> Result<TrainingReport, TrainerError> {
        while self.state.game_counter < self.config.games {
            if self.interrupted() {
                break;
            }
            self.play_game(expert);
            if self.interrupted() {
                // the game was abandoned mid-flight; do not count it
                break;
            }
            self.state.game_counter += 1;

            if self.config.grow_features
                && self.state.game_counter % self.config.add_feature_every == 0
            {
                self.expand_features();
            }
            if let Some(every) = self.config.checkpoint_every_games {
                if self.state.game_counter % every == 0 {
                    self.write_checkpoint().map_err(TrainerError::Checkpoint)?;
                }
            }
            self.log_progress();
        }
        if self.checkpoint.is_some() {
            self.write_checkpoint().map_err(TrainerError::Checkpoint)?;
        }
        Ok(self.report())
    }

    /// Plays one game to completion, harvesting and annotating experience.
    fn play_game(&mut self, expert: &mut dyn Expert) {
        let players = self.feature_sets.len();
        let mut game_state = self.rules.initial_state();
        let mut pending: Vec<Vec<ExperienceSample>> = vec![Vec::new(); players];

        while !self.rules.is_terminal(&game_state) {
            if self.interrupted() {
                // pending samples never see their episode end; they are
                // dropped rather than finalised with fabricated outcomes
                return;
            }
            let mv = expert.select_action(
                self.rules,
                &game_state,
                self.config.thinking_budget,
                &mut self.rng,
            );
            for mut sample in expert.generate_experiences() {
                self.annotate_sample(&mut sample);
                pending[usize::from(sample.mover())].push(sample);
            }
            self.rules.apply(&mut game_state, mv);
            self.state.action_counter += 1;
            if self.state.action_counter % self.config.update_weights_every == 0 {
                self.update_weights();
            }
        }

        let duration = i32::try_from(game_state.ply()).unwrap_or(i32::MAX);
        let outcomes = self.rules.outcome_values(&game_state);
        for (player, samples) in pending.into_iter().enumerate() {
            for mut sample in samples {
                sample.finalise_episode(duration, outcomes.clone());
                self.buffers[player].add(sample);
            }
        }
    }

    /// Computes the special-move annotation for a fresh sample and feeds
    /// the per-feature status tables.
    fn annotate_sample(&mut self, sample: &mut ExperienceSample) {
        let player = usize::from(sample.mover());
        let special = analyse_special_moves(self.rules, sample.state(), sample.legal_moves());
        for (i, &mv) in sample.legal_moves().iter().enumerate() {
            let active = active_feature_indices(
                &self.matcher,
                &self.feature_sets[player],
                sample.state(),
                mv,
            );
            self.status_tables[player].observe(
                special.winning.contains(i),
                special.losing.contains(i),
                special.anti_defeating.contains(i),
                &active,
            );
        }
        sample.annotate_special_moves(special.winning, special.losing, special.anti_defeating);
    }

    /// One batched gradient step per player.
    fn update_weights(&mut self) {
        for player in 0..self.feature_sets.len() {
            if self.buffers[player].is_empty() {
                continue;
            }
            let batch = self.buffers[player].sample_batch(self.config.batch_size, &mut self.rng);
            let feature_count = self.policy.feature_count(player);
            let mut gradients = vec![0.0f32; feature_count];
            let mut losses = Vec::with_capacity(batch.len());

            for sample in &batch {
                let move_features =
                    move_feature_vectors(&self.matcher, &self.feature_sets[player], sample);
                let predicted = self.policy.compute_distribution(&move_features, player);
                let target = sample.expert_distribution();
                losses.push(cross_entropy(&predicted, &target));
                let sample_gradients = linear::cross_entropy_gradients(
                    &move_features,
                    &predicted,
                    &target,
                    feature_count,
                );
                for (g, sg) in gradients.iter_mut().zip(&sample_gradients) {
                    *g += sg;
                }
            }

            #[expect(clippy::cast_precision_loss)]
            let scale = 1.0 / batch.len() as f32;
            for g in &mut gradients {
                *g *= scale;
            }
            self.optimiser.step(&mut self.policy, player, &gradients);
            self.state.last_loss_stats = DescriptiveStats::new(losses);
        }
        self.state.weight_update_counter += 1;
    }

    /// Runs feature discovery once per player on a worker pool and swaps
    /// the grown feature sets in only after every task has finished.
    pub(crate) fn expand_features(&mut self) {
        let players = self.feature_sets.len();
        let seeds: Vec<u64> = (0..players).map(|_| self.rng.random()).collect();
        let expander = self.expander.as_ref();
        let policy = &self.policy;
        let matcher = &self.matcher;
        let buffers = &self.buffers;
        let feature_sets = &self.feature_sets;
        let batch_size = self.config.batch_size;

        let results: Vec<Option<FeatureSet>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..players)
                .map(|player| {
                    let seed = seeds[player];
                    scope.spawn(move || {
                        let mut rng = Pcg64Mcg::seed_from_u64(seed);
                        let batch = buffers[player].sample_batch(batch_size, &mut rng);
                        expander.expand(
                            &batch,
                            &feature_sets[player],
                            policy,
                            player,
                            matcher,
                            &mut rng,
                        )
                    })
                })
                .collect();
            // joining every handle before returning is the barrier: the
            // shared policy must never observe a half-swapped state, and a
            // single player's failure must not abort the others
            handles
                .into_iter()
                .enumerate()
                .map(|(player, handle)| match handle.join() {
                    Ok(result) => result,
                    Err(_) => {
                        eprintln!(
                            "feature expansion for player {player} failed; keeping previous feature set"
                        );
                        None
                    }
                })
                .collect()
        });

        for (player, result) in results.into_iter().enumerate() {
            if let Some(new_set) = result {
                eprintln!(
                    "player {player}: feature set grown to {} features",
                    new_set.len()
                );
                self.policy.expand_player(player, new_set.len());
                self.status_tables[player].grow(new_set.len());
                self.feature_sets[player] = new_set;
            }
        }
    }

    fn write_checkpoint(&self) -> Result<(), CheckpointError> {
        let Some(writer) = &self.checkpoint else {
            return Ok(());
        };
        let counter = match self.config.checkpoint_counter {
            CheckpointCounter::Games => u64::from(self.state.game_counter),
            CheckpointCounter::WeightUpdates => self.state.weight_update_counter,
        };
        for player in 0..self.feature_sets.len() {
            writer.write_json(&format!("features_p{player}"), counter, &self.feature_sets[player])?;
            writer.write_json(
                &format!("policy_p{player}"),
                counter,
                &self.policy.player_weights(player),
            )?;
            writer.write_json(&format!("replay_p{player}"), counter, &self.buffers[player])?;
        }
        writer.write_json("optimiser_policy", counter, &self.optimiser)?;
        Ok(())
    }

    fn log_progress(&self) {
        let game = self.state.game_counter;
        if game % 10 != 0 && game != self.config.games {
            return;
        }
        let features: Vec<usize> = self.feature_sets.iter().map(FeatureSet::len).collect();
        match &self.state.last_loss_stats {
            Some(stats) => eprintln!(
                "game {game}: features {features:?}, mean loss {:.4}",
                stats.mean
            ),
            None => eprintln!("game {game}: features {features:?}"),
        }
    }

    fn report(&self) -> TrainingReport {
        TrainingReport {
            games: self.state.game_counter,
            actions: self.state.action_counter,
            weight_updates: self.state.weight_update_counter,
            feature_counts: self.feature_sets.iter().map(FeatureSet::len).collect(),
            buffered_samples: self.buffers.iter().map(UniformReplayBuffer::len).collect(),
            interrupted: self.interrupted(),
        }
    }
}

/// Unique active feature indices for one move.
fn active_feature_indices(
    matcher: &GridMatchEngine,
    features: &FeatureSet,
    state: &exion_game::BoardState,
    mv: exion_game::GridMove,
) -> Vec<usize> {
    let mut active: Vec<usize> = matcher
        .active_instances(features, state, mv)
        .iter()
        .map(|instance| instance.feature)
        .collect();
    active.sort_unstable();
    active.dedup();
    active
}

/// Active feature indices for every legal move of a sample.
fn move_feature_vectors(
    matcher: &GridMatchEngine,
    features: &FeatureSet,
    sample: &ExperienceSample,
) -> Vec<Vec<usize>> {
    sample
        .legal_moves()
        .iter()
        .map(|&mv| active_feature_indices(matcher, features, sample.state(), mv))
        .collect()
}

/// Cross-entropy of a predicted distribution against a target.
fn cross_entropy(predicted: &[f32], target: &[f32]) -> f32 {
    predicted
        .iter()
        .zip(target)
        .map(|(&p, &t)| if t > 0.0 { -t * p.max(1e-9).ln() } else { 0.0 })
        .sum()
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use exion_experience::ExperienceSample;
    use exion_features::{CellTest, Pattern, PatternElement};
    use exion_game::Breakthrough;
    use rand::RngCore;

    use super::*;
    use crate::expert::FlatMonteCarloExpert;

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            games: 2,
            add_feature_every: 1,
            update_weights_every: 4,
            batch_size: 8,
            replay_capacity: 64,
            thinking_budget: 8,
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn empty_feature_set_is_fatal() {
        let rules = Breakthrough::with_size(4, 5);
        let result = SelfPlayTrainer::new(
            &rules,
            FeatureSet::new(Vec::new()),
            TrainerConfig::default(),
        );
        assert!(matches!(result, Err(TrainerError::EmptyFeatureSet)));
    }

    #[test]
    fn short_run_collects_experience_per_player() {
        let rules = Breakthrough::with_size(4, 5);
        let mut trainer =
            SelfPlayTrainer::new(&rules, FeatureSet::starter(), small_config()).unwrap();
        let mut expert = FlatMonteCarloExpert::new();
        let report = trainer.run(&mut expert).unwrap();

        assert_eq!(report.games, 2);
        assert!(report.actions > 0);
        assert!(!report.interrupted);
        assert_eq!(report.buffered_samples.len(), 2);
        for &count in &report.buffered_samples {
            assert!(count > 0);
        }
        // the status tables shrank: quiet opening moves cleared flags
        let tables = trainer.status_tables();
        assert!(tables[0].always_winning_count() < trainer.feature_sets()[0].len());
    }

    #[test]
    fn interrupting_before_start_plays_no_games() {
        let rules = Breakthrough::with_size(4, 5);
        let mut trainer =
            SelfPlayTrainer::new(&rules, FeatureSet::starter(), small_config()).unwrap();
        trainer.interrupt_flag().store(true, Ordering::Relaxed);
        let mut expert = FlatMonteCarloExpert::new();
        let report = trainer.run(&mut expert).unwrap();
        assert_eq!(report.games, 0);
        assert!(report.interrupted);
    }

    #[test]
    fn checkpoints_are_written_per_player() {
        let rules = Breakthrough::with_size(4, 5);
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig {
            checkpoint_every_games: Some(1),
            grow_features: false,
            ..small_config()
        };
        let mut trainer = SelfPlayTrainer::new(&rules, FeatureSet::starter(), config)
            .unwrap()
            .with_checkpoint_dir(dir.path().to_path_buf());
        let mut expert = FlatMonteCarloExpert::new();
        trainer.run(&mut expert).unwrap();

        for name in [
            "features_p0_000001.json",
            "features_p1_000001.json",
            "policy_p0_000001.json",
            "replay_p1_000001.json",
            "optimiser_policy_000002.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }
    }

    /// Stub expander that records, at the moment each player's task runs,
    /// how many features the shared policy holds for player 0.
    struct BarrierProbe {
        observed: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl FeatureExpander for BarrierProbe {
        fn expand(
            &self,
            _batch: &[&ExperienceSample],
            features: &FeatureSet,
            policy: &LinearPolicy,
            player: usize,
            _matcher: &dyn exion_features::MatchEngine,
            _rng: &mut dyn RngCore,
        ) -> Option<FeatureSet> {
            if player == 1 {
                // let player 0's task finish well before this one
                thread::sleep(Duration::from_millis(50));
            }
            self.observed
                .lock()
                .unwrap()
                .push((player, policy.feature_count(0)));
            #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let offset = 2 + player as i8;
            features.expand(Pattern::proactive(vec![PatternElement::new(
                2,
                offset,
                CellTest::Enemy,
            )]))
        }
    }

    #[test]
    fn feature_sets_swap_only_after_all_players_finish() {
        let rules = Breakthrough::with_size(4, 5);
        let mut trainer =
            SelfPlayTrainer::new(&rules, FeatureSet::starter(), small_config()).unwrap();
        let initial_count = trainer.feature_sets()[0].len();
        let observed = Arc::new(Mutex::new(Vec::new()));
        trainer = trainer.with_expander(Box::new(BarrierProbe {
            observed: Arc::clone(&observed),
        }));

        trainer.expand_features();

        // both players' sets were swapped in
        assert_eq!(trainer.feature_sets()[0].len(), initial_count + 1);
        assert_eq!(trainer.feature_sets()[1].len(), initial_count + 1);
        assert_eq!(trainer.policy().feature_count(0), initial_count + 1);

        // but no in-flight task ever observed a half-swapped policy: even
        // the slow task saw player 0's original vocabulary
        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 2);
        for &(_, seen_count) in observed.iter() {
            assert_eq!(seen_count, initial_count);
        }
    }
}
