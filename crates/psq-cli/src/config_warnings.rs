use psq_config::PsqConfig;

pub fn warn_unconfigured(config: &PsqConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &PsqConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    let mut warnings = Vec::new();

    if !config.qbench.is_configured() && has_env_prefix(&env_keys, "PSQ_QBENCH") {
        warnings.push(
            "QBench config appears default while PSQ_QBENCH* env vars exist. Use double underscores (example: PSQ_QBENCH__CLIENT_ID)."
                .to_string(),
        );
    }

    if !config.supabase.is_configured() && has_env_prefix(&env_keys, "PSQ_SUPABASE") {
        warnings.push(
            "Supabase config appears default while PSQ_SUPABASE* env vars exist. Use double underscores (example: PSQ_SUPABASE__ANON_KEY)."
                .to_string(),
        );
    }

    warnings
}

fn has_env_prefix(keys: &[String], prefix: &str) -> bool {
    keys.iter().any(|key| key.starts_with(prefix))
}
