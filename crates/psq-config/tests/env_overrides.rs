//! Environment variable mapping, sandboxed with `figment::Jail`.

use figment::Jail;
use pretty_assertions::assert_eq;
use psq_config::{ConfigError, PsqConfig};

#[test]
fn flat_qbench_env_vars_fill_the_qbench_section() {
    Jail::expect_with(|jail| {
        jail.set_env("QBENCH_BASE_URL", "https://lab.qbench.net");
        jail.set_env("QBENCH_CLIENT_ID", "client-1");
        jail.set_env("QBENCH_CLIENT_SECRET", "s3cret");
        jail.set_env("QBENCH_JWT_TTL_S", "3580");
        jail.set_env("QBENCH_JWT_LEEWAY_S", "20");

        let config = PsqConfig::load().expect("config loads");
        assert_eq!(config.qbench.base_url, "https://lab.qbench.net");
        assert_eq!(config.qbench.client_id, "client-1");
        assert_eq!(config.qbench.jwt_ttl_secs, Some(3580));
        assert_eq!(config.qbench.jwt_leeway_secs, Some(20));
        assert!(config.qbench.validate().is_ok());
        Ok(())
    });
}

#[test]
fn flat_supabase_env_vars_fill_the_supabase_section() {
    Jail::expect_with(|jail| {
        jail.set_env("SUPABASE_URL", "https://abcd.supabase.co");
        jail.set_env("SUPABASE_ANON_KEY", "anon");

        let config = PsqConfig::load().expect("config loads");
        assert!(config.supabase.is_configured());
        assert_eq!(config.supabase.table, "ps_reports");
        Ok(())
    });
}

#[test]
fn prefixed_env_beats_flat_env() {
    Jail::expect_with(|jail| {
        jail.set_env("QBENCH_CLIENT_ID", "from-flat");
        jail.set_env("PSQ_QBENCH__CLIENT_ID", "from-prefixed");
        jail.set_env("PSQ_QBENCH__MAX_ATTEMPTS", "6");
        jail.set_env("PSQ_REPORT__OUTPUT_DIR", "/tmp/psq-reports");

        let config = PsqConfig::load().expect("config loads");
        assert_eq!(config.qbench.client_id, "from-prefixed");
        assert_eq!(config.qbench.max_attempts, 6);
        assert_eq!(
            config.report.output_dir,
            std::path::PathBuf::from("/tmp/psq-reports")
        );
        Ok(())
    });
}

#[test]
fn missing_leeway_is_reported_by_name() {
    Jail::expect_with(|jail| {
        jail.set_env("QBENCH_BASE_URL", "https://lab.qbench.net");
        jail.set_env("QBENCH_CLIENT_ID", "client-1");
        jail.set_env("QBENCH_CLIENT_SECRET", "s3cret");
        jail.set_env("QBENCH_JWT_TTL_S", "3580");

        let config = PsqConfig::load().expect("config loads");
        let err = config.qbench.validate().unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::Missing { fields, .. } if fields == &vec!["jwt_leeway_secs".to_string()]
        ));
        assert!(err.to_string().contains("jwt_leeway_secs"));
        Ok(())
    });
}

#[test]
fn malformed_number_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.set_env("PSQ_QBENCH__MAX_ATTEMPTS", "many");

        let result = PsqConfig::load();
        assert!(matches!(result, Err(ConfigError::Figment(_))));
        Ok(())
    });
}

#[test]
fn flat_and_prefixed_seconds_keys_do_not_collide() {
    Jail::expect_with(|jail| {
        jail.set_env("QBENCH_JWT_TTL_S", "3580");
        jail.set_env("QBENCH_JWT_LEEWAY_S", "20");
        jail.set_env("PSQ_QBENCH__JWT_LEEWAY_SECS", "45");

        let config = PsqConfig::load().expect("config loads");
        assert_eq!(config.qbench.jwt_ttl_secs, Some(3580));
        assert_eq!(config.qbench.jwt_leeway_secs, Some(45));
        Ok(())
    });
}

#[test]
fn toml_seconds_keys_load_without_aliases() {
    Jail::expect_with(|jail| {
        jail.create_dir(".psq")?;
        jail.create_file(
            ".psq/config.toml",
            "[qbench]\njwt_ttl_secs = 1800\njwt_leeway_secs = 30\n",
        )?;

        let config = PsqConfig::load().expect("config loads");
        assert_eq!(config.qbench.jwt_ttl_secs, Some(1800));
        assert_eq!(config.qbench.jwt_leeway_secs, Some(30));
        Ok(())
    });
}
