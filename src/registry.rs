//! Registry of robot behaviors keyed by robot type name.
//!
//! Build a [`RobotRegistry`] at startup, then either pass it around or
//! [`install`] it as the process-wide registry. Once installed it is
//! immutable, so reads from any number of environments take no lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::core::{RansError, Result};
use crate::robots::{self, RobotBehavior};

/// Key-value construction parameters. Stringly-typed; robots parse what they use.
pub type KwArgs = HashMap<String, String>;

/// Factory closure type for constructing robots with kwargs.
pub type RobotFactory = Box<dyn Fn(&KwArgs) -> Result<Box<dyn RobotBehavior>> + Send + Sync>;

/// Name -> constructor table.
#[derive(Default)]
pub struct RobotRegistry {
    factories: BTreeMap<String, RobotFactory>,
}

impl std::fmt::Debug for RobotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotRegistry").field("robots", &self.names()).finish()
    }
}

impl RobotRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry holding every built-in robot.
    pub fn with_builtin_robots() -> Result<Self> {
        let mut r = Self::new();
        robots::register_builtin(&mut r)?;
        Ok(r)
    }

    pub fn register<S: Into<String>>(&mut self, name: S, factory: RobotFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RansError::DuplicateName(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn create(&self, name: &str, kwargs: &KwArgs) -> Result<Box<dyn RobotBehavior>> {
        match self.factories.get(name) {
            Some(f) => f(kwargs),
            None => Err(RansError::UnknownRobot(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool { self.factories.contains_key(name) }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> { self.factories.keys().map(String::as_str).collect() }

    pub fn len(&self) -> usize { self.factories.len() }
    pub fn is_empty(&self) -> bool { self.factories.is_empty() }
}

static REGISTRY: OnceLock<RobotRegistry> = OnceLock::new();

/// Install `registry` as the process-wide registry. Only the first call succeeds.
pub fn install(registry: RobotRegistry) -> Result<&'static RobotRegistry> {
    let names = registry.names().join(", ");
    REGISTRY
        .set(registry)
        .map_err(|_| RansError::AlreadyInitialized("robot registry".into()))?;
    log::info!("robot registry installed: [{names}]");
    global().ok_or_else(|| RansError::AlreadyInitialized("robot registry".into()))
}

/// The installed process-wide registry, if any.
pub fn global() -> Option<&'static RobotRegistry> { REGISTRY.get() }

/// The process-wide registry, installing the built-in robots on first use.
pub fn global_or_builtin() -> &'static RobotRegistry {
    REGISTRY.get_or_init(|| {
        let mut r = RobotRegistry::new();
        if let Err(e) = robots::register_builtin(&mut r) {
            log::error!("built-in robot registration failed: {e}");
        }
        r
    })
}

/// Helper to adapt a concrete robot constructor into a factory.
pub fn factory_of<R, F>(ctor: F) -> RobotFactory
where
    R: RobotBehavior + 'static,
    F: Fn(&KwArgs) -> Result<R> + Send + Sync + 'static,
{
    Box::new(move |kwargs: &KwArgs| Ok(Box::new(ctor(kwargs)?) as Box<dyn RobotBehavior>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::rng::RngStream;

    #[derive(Default)]
    struct Dummy;

    impl RobotBehavior for Dummy {
        fn name(&self) -> &str { "Dummy" }
        fn compute_action(&mut self, observation: &[f64]) -> Vec<f64> { vec![observation.len() as f64] }
        fn action_dim(&self) -> usize { 1 }
        fn observation_dim(&self) -> usize { 0 }
        fn reset(&mut self, _rng: &mut RngStream) {}
    }

    #[test]
    fn register_and_create_dummy() {
        let mut r = RobotRegistry::new();
        r.register("Dummy", factory_of(|_k: &KwArgs| Ok(Dummy::default()))).expect("register ok");
        let mut robot = r.create("Dummy", &KwArgs::new()).expect("create ok");
        assert_eq!(robot.compute_action(&[1.0, 2.0]), vec![2.0]);
        assert_eq!(robot.action_dim(), 1);
    }

    #[test]
    fn duplicate_and_unknown_names() {
        let mut r = RobotRegistry::new();
        r.register("Dummy", factory_of(|_k: &KwArgs| Ok(Dummy::default()))).unwrap();
        let err = r.register("Dummy", factory_of(|_k: &KwArgs| Ok(Dummy::default()))).unwrap_err();
        assert_eq!(err, RansError::DuplicateName("Dummy".into()));
        assert_eq!(r.len(), 1);
        assert!(matches!(r.create("Ghost", &KwArgs::new()), Err(RansError::UnknownRobot(n)) if n == "Ghost"));
    }

    #[test]
    fn constructor_errors_propagate() {
        let mut r = RobotRegistry::new();
        r.register(
            "Broken",
            factory_of(|_k: &KwArgs| -> Result<Dummy> { Err(RansError::InvalidConfig("no".into())) }),
        )
        .unwrap();
        assert!(matches!(r.create("Broken", &KwArgs::new()), Err(RansError::InvalidConfig(_))));
    }

    #[test]
    fn kwargs_reach_the_constructor() {
        let r = RobotRegistry::with_builtin_robots().unwrap();
        let mut kwargs = KwArgs::new();
        kwargs.insert("k_lin".into(), "0.5".into());
        assert_eq!(r.create("Jetbot", &kwargs).unwrap().name(), "Jetbot");
        kwargs.insert("k_lin".into(), "fast".into());
        assert!(matches!(r.create("Jetbot", &kwargs), Err(RansError::InvalidConfig(_))));
    }

    #[test]
    fn builtin_names_sorted() {
        let r = RobotRegistry::with_builtin_robots().unwrap();
        let names = r.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(r.contains("FloatingPlatform"));
        assert_eq!(r.len(), robots::BUILTIN_ROBOTS.len());
    }

    #[test]
    fn global_registry_installs_once() {
        let g = global_or_builtin();
        assert!(g.contains("Jetbot"));
        assert!(matches!(install(RobotRegistry::new()), Err(RansError::AlreadyInitialized(_))));
        assert!(std::ptr::eq(global().unwrap(), g));
    }
}
