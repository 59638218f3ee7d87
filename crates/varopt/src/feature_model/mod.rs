//! Constraint store and background valid-model enumeration.
//!
//! A [`FeatureModel`] is built in two phases: [`FeatureModel::new`] only
//! stores features and clauses, [`FeatureModel::start_enumeration`] hands the
//! formula to a worker thread. The worker collects every model into a private
//! buffer and publishes it as a frozen [`ValidModels`] snapshot, so queries
//! never see a partial result. Queries block on a condition variable until
//! the state leaves [`EnumerationState::Enumerating`].

mod state;
mod valid_models;

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use rayon::prelude::*;
use varopt_sat::{ClauseSet, ModelEnumerator, Variable};

use crate::configuration::FeatureConfiguration;
use crate::error::{Result, VaroptError};
use crate::feature::Feature;

pub use state::{EnumerationState, FailureReason};
pub use valid_models::ValidModels;
use valid_models::symmetric_difference;

/// Wall-clock limit for one enumeration run unless configured otherwise
pub const DEFAULT_ENUMERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Shared {
    state: Mutex<EnumerationState>,
    finished: Condvar,
}

/// Binary and numeric features plus the CNF formula over the binary ones.
///
/// Binary feature ids are the formula's variables. Numeric features are
/// numbered after them and never appear in clauses.
#[derive(Debug)]
pub struct FeatureModel {
    binary_features: BTreeMap<Variable, Feature>,
    numeric_features: BTreeMap<Variable, Feature>,
    formula: ClauseSet,
    feature_count: usize,
    formula_count: usize,
    ids_by_name: HashMap<String, Variable>,
    free_variables: Vec<Variable>,
    timeout: Duration,
    shared: Arc<Shared>,
    cancel: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    minimal_model: OnceLock<HashMap<String, bool>>,
}

impl FeatureModel {
    /// Store the model without starting enumeration.
    ///
    /// `feature_count` and `formula_count` are the counts declared by the
    /// source the model was read from; they are kept for reporting only.
    pub fn new(
        binary_features: BTreeMap<Variable, Feature>,
        numeric_features: BTreeMap<Variable, Feature>,
        formula: ClauseSet,
        feature_count: usize,
        formula_count: usize,
    ) -> Self {
        let ids_by_name = binary_features
            .iter()
            .map(|(&id, feature)| (feature.name().to_string(), id))
            .collect();

        let num_variables = binary_features.keys().next_back().copied().unwrap_or(0);
        let free_variables = formula
            .free_variables(num_variables)
            .into_iter()
            .filter(|id| binary_features.contains_key(id))
            .collect::<Vec<_>>();

        log::debug!(
            "Feature model with {} binary and {} numeric features, {} clauses, {} unconstrained",
            binary_features.len(),
            numeric_features.len(),
            formula.len(),
            free_variables.len()
        );

        Self {
            binary_features,
            numeric_features,
            formula,
            feature_count,
            formula_count,
            ids_by_name,
            free_variables,
            timeout: DEFAULT_ENUMERATION_TIMEOUT,
            shared: Arc::new(Shared {
                state: Mutex::new(EnumerationState::NotStarted),
                finished: Condvar::new(),
            }),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            minimal_model: OnceLock::new(),
        }
    }

    /// Construct and immediately start enumeration
    pub fn spawn(
        binary_features: BTreeMap<Variable, Feature>,
        numeric_features: BTreeMap<Variable, Feature>,
        formula: ClauseSet,
        feature_count: usize,
        formula_count: usize,
    ) -> Result<Self> {
        let model = Self::new(binary_features, numeric_features, formula, feature_count, formula_count);
        model.start_enumeration()?;
        Ok(model)
    }

    /// Set the wall-clock limit used by subsequent enumeration runs
    pub fn with_enumeration_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn set_enumeration_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn enumeration_timeout(&self) -> Duration {
        self.timeout
    }

    /// Launch the enumeration worker. Does nothing once enumeration has been started.
    pub fn start_enumeration(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if !matches!(*state, EnumerationState::NotStarted) {
            return Ok(());
        }
        self.launch(&mut state)
    }

    /// Relaunch enumeration after a failure.
    ///
    /// Returns whether a new run was started; a running, ready or never
    /// started model is left alone.
    pub fn restart(&self) -> Result<bool> {
        let mut state = self.shared.state.lock();
        if !state.is_failed() {
            return Ok(false);
        }

        log::info!("Restarting enumeration after failure: {}", *state);
        self.launch(&mut state)?;
        Ok(true)
    }

    /// Ask a running enumeration to stop; it ends in [`FailureReason::Cancelled`]
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn launch(&self, state: &mut EnumerationState) -> Result<()> {
        self.cancel.store(false, Ordering::SeqCst);

        let num_variables = self.binary_features.keys().next_back().copied().unwrap_or(0);
        let enumerator = ModelEnumerator::new(num_variables, self.formula.clone())
            .with_timeout(self.timeout)
            .with_cancel_flag(Arc::clone(&self.cancel));
        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name("varopt-enumeration".to_string())
            .spawn(move || run_enumeration(enumerator, &shared))?;

        *state = EnumerationState::Enumerating;

        // A previous worker has already published its result
        if let Some(previous) = self.worker.lock().replace(handle) {
            let _ = previous.join();
        }
        Ok(())
    }

    /// Block until enumeration is no longer running and return the state it settled in.
    ///
    /// Returns [`EnumerationState::NotStarted`] right away if enumeration was never started.
    pub fn wait_until_ready(&self) -> EnumerationState {
        let mut state = self.shared.state.lock();
        while state.is_running() {
            self.shared.finished.wait(&mut state);
        }
        state.clone()
    }

    /// Current state without blocking
    pub fn state(&self) -> EnumerationState {
        self.shared.state.lock().clone()
    }

    pub fn is_failed(&self) -> bool {
        self.shared.state.lock().is_failed()
    }

    /// The frozen valid models, starting enumeration first if needed
    pub fn valid_models(&self) -> Result<Arc<ValidModels>> {
        self.start_enumeration()?;
        match self.wait_until_ready() {
            EnumerationState::Ready(models) => Ok(models),
            EnumerationState::Failed(reason) => Err(reason.to_error()),
            other => Err(VaroptError::InterruptedDuringEnumeration(format!(
                "enumeration ended in state {}",
                other
            ))),
        }
    }

    pub fn valid_model_count(&self) -> Result<usize> {
        Ok(self.valid_models()?.len())
    }

    /// Whether the configuration's active binary features are exactly one valid model.
    ///
    /// A failed enumeration is reported before any check of the configuration.
    /// Names of numeric features among the active binary ones belong to the
    /// model but never match a valid model.
    pub fn is_valid(&self, config: &FeatureConfiguration) -> Result<bool> {
        if let EnumerationState::Failed(reason) = self.state() {
            return Err(reason.to_error());
        }

        let (active, unknown) = self.split_active(config);
        let foreign: Vec<String> = unknown
            .iter()
            .filter(|name| !self.contains_feature(name))
            .cloned()
            .collect();
        if !foreign.is_empty() {
            return Err(VaroptError::ConfigurationNotSubsetOfModel { foreign });
        }

        let models = self.valid_models()?;
        Ok(unknown.is_empty() && models.contains(&active))
    }

    /// The first valid model with the fewest active features, as a full assignment
    pub fn minimal_model(&self) -> Result<HashMap<String, bool>> {
        if let Some(model) = self.minimal_model.get() {
            return Ok(model.clone());
        }

        let models = self.valid_models()?;
        let smallest = models.smallest().ok_or(VaroptError::ModelHasNoValidConfigurations)?;
        let assignment = self.assignment(smallest);
        Ok(self.minimal_model.get_or_init(|| assignment).clone())
    }

    /// Active features of a uniformly drawn valid model
    pub fn random_valid_config<R: Rng>(&self, rng: &mut R) -> Result<HashSet<Feature>> {
        let models = self.valid_models()?;
        if models.is_empty() {
            return Err(VaroptError::ModelHasNoValidConfigurations);
        }

        let model = models
            .get(rng.gen_range(0..models.len()))
            .ok_or(VaroptError::ModelHasNoValidConfigurations)?;

        Ok(model
            .iter()
            .filter_map(|id| self.binary_features.get(id))
            .cloned()
            .collect())
    }

    /// Every valid model within `max_diff` of the configuration's active binary features.
    ///
    /// Distance is the size of the symmetric difference of the two active
    /// sets. Active features unknown to this model count towards it. Models
    /// come back in enumeration order as full assignments.
    pub fn near_models(&self, config: &FeatureConfiguration, max_diff: usize) -> Result<Vec<HashMap<String, bool>>> {
        let (query, foreign) = self.split_active(config);
        let models = self.valid_models()?;

        let near: Vec<&Vec<Variable>> = models
            .as_slice()
            .par_iter()
            .filter(|model| {
                model.len().abs_diff(query.len()) + foreign.len() <= max_diff
                    && symmetric_difference(model.as_slice(), &query) + foreign.len() <= max_diff
            })
            .collect();

        log::debug!(
            "{} of {} valid models within distance {}",
            near.len(),
            models.len(),
            max_diff
        );

        Ok(near.into_iter().map(|model| self.assignment(model)).collect())
    }

    /// Every numeric feature at its minimum
    pub fn initial_numeric_values(&self) -> HashMap<String, i64> {
        self.numeric_features
            .values()
            .filter_map(|f| f.min_value().map(|min| (f.name().to_string(), min)))
            .collect()
    }

    /// Full binary assignment with exactly the named features active
    pub fn binary_assignment<'a>(&self, active: impl IntoIterator<Item = &'a str>) -> HashMap<String, bool> {
        let mut assignment: HashMap<String, bool> = self.binary_features
            .values()
            .map(|f| (f.name().to_string(), false))
            .collect();
        for name in active {
            if let Some(value) = assignment.get_mut(name) {
                *value = true;
            }
        }
        assignment
    }

    fn assignment(&self, model: &[Variable]) -> HashMap<String, bool> {
        self.binary_features
            .iter()
            .map(|(id, f)| (f.name().to_string(), model.binary_search(id).is_ok()))
            .collect()
    }

    /// Ascending ids of the active binary features, and the sorted names of
    /// active entries that are not binary features of this model
    fn split_active(&self, config: &FeatureConfiguration) -> (Vec<Variable>, Vec<String>) {
        let mut ids = Vec::new();
        let mut unknown = Vec::new();
        for name in config.active_features() {
            match self.ids_by_name.get(name) {
                Some(&id) => ids.push(id),
                None => unknown.push(name.to_string()),
            }
        }
        ids.sort_unstable();
        (ids, unknown)
    }

    /// Names of binary features no clause mentions
    pub fn free_features(&self) -> Vec<&str> {
        self.free_variables
            .iter()
            .filter_map(|id| self.binary_features.get(id))
            .map(Feature::name)
            .collect()
    }

    pub fn binary_features(&self) -> &BTreeMap<Variable, Feature> {
        &self.binary_features
    }

    pub fn numeric_features(&self) -> &BTreeMap<Variable, Feature> {
        &self.numeric_features
    }

    /// Binary features, then numeric ones, each by ascending id
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.binary_features.values().chain(self.numeric_features.values())
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features().find(|f| f.name() == name)
    }

    pub fn contains_feature(&self, name: &str) -> bool {
        self.ids_by_name.contains_key(name) || self.numeric_features.values().any(|f| f.name() == name)
    }

    pub fn formula(&self) -> &ClauseSet {
        &self.formula
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn formula_count(&self) -> usize {
        self.formula_count
    }
}

impl Drop for FeatureModel {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}

fn run_enumeration(enumerator: ModelEnumerator, shared: &Shared) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || enumerator.collect()));

    let next = match outcome {
        Ok(Ok((models, stats))) => {
            log::debug!("Publishing {} valid models ({} conflicts)", models.len(), stats.conflicts);
            EnumerationState::Ready(Arc::new(ValidModels::new(models)))
        }
        Ok(Err(e)) => {
            log::warn!("Valid model enumeration failed: {}", e);
            EnumerationState::Failed(FailureReason::from(e))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::warn!("Enumeration worker panicked: {}", message);
            EnumerationState::Failed(FailureReason::WorkerPanicked(message))
        }
    };

    *shared.state.lock() = next;
    shared.finished.notify_all();
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;
    use varopt_sat::Literal;

    fn binary(names: &[&str]) -> BTreeMap<Variable, Feature> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as Variable + 1, Feature::binary(*name)))
            .collect()
    }

    fn model(names: &[&str], clauses: Vec<Vec<Literal>>) -> FeatureModel {
        let count = clauses.len();
        FeatureModel::spawn(binary(names), BTreeMap::new(), ClauseSet::from_literals(clauses), names.len(), count)
            .unwrap()
    }

    fn config(active: &[&str], inactive: &[&str]) -> FeatureConfiguration {
        let binary = active
            .iter()
            .map(|n| (n.to_string(), true))
            .chain(inactive.iter().map(|n| (n.to_string(), false)))
            .collect();
        FeatureConfiguration::new("test", binary, HashMap::new(), HashMap::new())
    }

    fn active_sets(models: &[HashMap<String, bool>]) -> BTreeSet<BTreeSet<String>> {
        models
            .iter()
            .map(|m| m.iter().filter(|(_, &v)| v).map(|(k, _)| k.clone()).collect())
            .collect()
    }

    #[test]
    fn test_new_does_not_start() {
        let m = FeatureModel::new(binary(&["a"]), BTreeMap::new(), ClauseSet::new(), 1, 0);
        assert!(matches!(m.state(), EnumerationState::NotStarted));
        assert!(matches!(m.wait_until_ready(), EnumerationState::NotStarted));
    }

    #[test]
    fn test_valid_models_of_implication() {
        let m = model(&["feature1", "feature2"], vec![vec![1], vec![1, -2]]);
        assert!(m.wait_until_ready().is_ready());
        assert_eq!(m.valid_model_count().unwrap(), 2);

        assert!(m.is_valid(&config(&["feature1"], &["feature2"])).unwrap());
        assert!(m.is_valid(&config(&["feature1", "feature2"], &[])).unwrap());
        assert!(!m.is_valid(&config(&["feature2"], &["feature1"])).unwrap());
        assert!(!m.is_valid(&config(&[], &["feature1", "feature2"])).unwrap());
    }

    #[test]
    fn test_queries_start_enumeration_lazily() {
        let m = FeatureModel::new(binary(&["a", "b"]), BTreeMap::new(), ClauseSet::from_literals([vec![1]]), 2, 1);
        assert!(m.is_valid(&config(&["a"], &["b"])).unwrap());
        assert!(m.state().is_ready());
    }

    #[test]
    fn test_foreign_features_are_rejected() {
        let m = model(&["a", "b"], vec![]);
        let err = m.is_valid(&config(&["a", "z"], &[])).unwrap_err();
        assert!(matches!(err, VaroptError::ConfigurationNotSubsetOfModel { foreign } if foreign == vec!["z"]));
    }

    #[test]
    fn test_numeric_names_are_part_of_the_model() {
        let numeric = [(3, Feature::numeric("gears", 4, 6, crate::feature::StepFunction::Add(1)).unwrap())]
            .into_iter()
            .collect();
        let m = FeatureModel::spawn(binary(&["a", "b"]), numeric, ClauseSet::from_literals([vec![1]]), 3, 1)
            .unwrap();

        // known to the model, but never part of a binary valid model
        assert!(!m.is_valid(&config(&["a", "gears"], &["b"])).unwrap());
        assert!(m.is_valid(&config(&["a"], &["b"])).unwrap());
    }

    #[test]
    fn test_failure_is_reported_before_foreign_features() {
        let m = model(&["a"], vec![vec![1], vec![-1]]);
        assert!(m.wait_until_ready().is_failed());

        let err = m.is_valid(&config(&["a", "z"], &[])).unwrap_err();
        assert!(matches!(err, VaroptError::EnumerationFailed(_)));
    }

    #[test]
    fn test_free_features() {
        let m = model(&["a", "b", "c"], vec![vec![1, -2]]);
        assert_eq!(m.free_features(), vec!["c"]);
        // c is free: every model appears with c both on and off
        assert_eq!(m.valid_model_count().unwrap(), 6);
    }

    #[test]
    fn test_minimal_model() {
        let m = model(&["a", "b", "c"], vec![vec![1], vec![-2, 3]]);
        let minimal = m.minimal_model().unwrap();
        assert_eq!(minimal["a"], true);
        assert_eq!(minimal["b"], false);
        assert_eq!(minimal["c"], false);
        assert_eq!(m.minimal_model().unwrap(), minimal);
    }

    #[test]
    fn test_near_models_distance() {
        // exactly one of a, b, c
        let m = model(&["a", "b", "c"], vec![vec![1, 2, 3], vec![-1, -2], vec![-1, -3], vec![-2, -3]]);
        let query = config(&["a"], &["b", "c"]);

        let only_a: BTreeSet<BTreeSet<String>> = [["a".to_string()].into_iter().collect()].into_iter().collect();
        assert_eq!(active_sets(&m.near_models(&query, 0).unwrap()), only_a);
        assert_eq!(m.near_models(&query, 1).unwrap().len(), 1);
        assert_eq!(m.near_models(&query, 2).unwrap().len(), 3);
    }

    #[test]
    fn test_near_models_counts_foreign_features() {
        let m = model(&["a"], vec![vec![1]]);
        assert!(m.near_models(&config(&["a", "x"], &[]), 0).unwrap().is_empty());
        assert_eq!(m.near_models(&config(&["a", "x"], &[]), 1).unwrap().len(), 1);
    }

    #[test]
    fn test_random_valid_config() {
        let m = model(&["a", "b"], vec![vec![1], vec![1, -2]]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let features = m.random_valid_config(&mut rng).unwrap();
            assert!(features.contains(&Feature::binary("a")));
        }
    }

    #[test]
    fn test_unsatisfiable_model_has_no_configurations() {
        let m = model(&["a", "b"], vec![vec![1, 2], vec![1, -2], vec![-1, 2], vec![-1, -2]]);
        assert!(m.wait_until_ready().is_ready());
        assert_eq!(m.valid_model_count().unwrap(), 0);
        assert!(matches!(m.minimal_model(), Err(VaroptError::ModelHasNoValidConfigurations)));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(m.random_valid_config(&mut rng), Err(VaroptError::ModelHasNoValidConfigurations)));
    }

    #[test]
    fn test_contradiction_fails_and_restarts() {
        let m = model(&["a"], vec![vec![1], vec![-1]]);
        let state = m.wait_until_ready();
        assert!(matches!(state, EnumerationState::Failed(FailureReason::Contradiction { .. })));
        assert!(m.is_failed());
        assert!(matches!(
            m.is_valid(&config(&["a"], &[])),
            Err(VaroptError::EnumerationFailed(_))
        ));

        assert!(m.restart().unwrap());
        assert!(m.wait_until_ready().is_failed());
    }

    #[test]
    fn test_restart_is_noop_when_ready() {
        let m = model(&["a"], vec![]);
        m.wait_until_ready();
        assert!(!m.restart().unwrap());
        assert!(m.state().is_ready());
    }

    #[test]
    fn test_timeout_fails() {
        let names: Vec<String> = (0..16).map(|i| format!("f{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let m = FeatureModel::new(binary(&names), BTreeMap::new(), ClauseSet::new(), 16, 0)
            .with_enumeration_timeout(Duration::ZERO);
        m.start_enumeration().unwrap();

        assert!(matches!(m.wait_until_ready(), EnumerationState::Failed(FailureReason::Timeout { .. })));
        assert!(matches!(m.valid_model_count(), Err(VaroptError::EnumerationFailed(_))));
    }

    #[test]
    fn test_cancel_then_restart() {
        let names: Vec<String> = (0..40).map(|i| format!("f{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let m = model(&names, vec![]);

        m.cancel();
        assert!(matches!(m.wait_until_ready(), EnumerationState::Failed(FailureReason::Cancelled)));

        assert!(m.restart().unwrap());
        m.cancel();
        assert!(matches!(m.wait_until_ready(), EnumerationState::Failed(FailureReason::Cancelled)));
    }

    #[test]
    fn test_restart_recovers_after_cancel() {
        let names: Vec<String> = (0..18).map(|i| format!("f{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let m = model(&names, vec![vec![1]]);

        m.cancel();
        assert!(matches!(m.wait_until_ready(), EnumerationState::Failed(FailureReason::Cancelled)));
        assert!(m.is_failed());

        assert!(m.restart().unwrap());
        assert!(m.wait_until_ready().is_ready());
        assert!(!m.is_failed());
        assert_eq!(m.valid_model_count().unwrap(), 1 << 17);
    }

    #[test]
    fn test_initial_numeric_values() {
        let numeric = [(3, Feature::numeric("gears", 4, 6, crate::feature::StepFunction::Add(1)).unwrap())]
            .into_iter()
            .collect();
        let m = FeatureModel::new(binary(&["a", "b"]), numeric, ClauseSet::new(), 3, 0);
        assert_eq!(m.initial_numeric_values()["gears"], 4);
        assert_eq!(m.features().count(), 3);
        assert!(m.contains_feature("gears"));
        assert!(!m.contains_feature("wheels"));
    }
}
