use std::path::PathBuf;
use std::sync::{Arc, Once};

use archetype_sim::{ArchetypeCatalog, RunConfig};

static INIT: Once = Once::new();

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path("test_run_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test run config at {}",
            config_path.display()
        );

        std::env::set_var("ARCHETYPE_RUN_CONFIG_PATH", &config_path);
    });
}

/// Catalog with two archetypes whose interests do not overlap.
pub fn two_archetype_catalog() -> Arc<ArchetypeCatalog> {
    let path = fixture_path("two_archetypes.json");
    Arc::new(ArchetypeCatalog::from_file(&path).expect("two-archetype fixture should parse"))
}

pub fn small_config(seed: u64, parallel: bool) -> RunConfig {
    RunConfig {
        num_users: 120,
        num_rounds: 3,
        num_simulations: 8,
        interests_per_user: 5,
        seed: Some(seed),
        parallel,
    }
}
