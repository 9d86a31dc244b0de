use clap::Parser;
use std::path::Path;

mod commandline;
mod defaults;
mod file;
mod primitives;

use commandline::{Args, Output};
use config::Config;
use defaults::Defaults;

pub(crate) use commandline::Operation;
pub(crate) use file::{ConfigFile as Configuration, Media, OpenTelemetry, Repo, Sled, Store, Tracing};
pub(crate) use primitives::LogFormat;

/// A fully resolved tubely configuration along with the operation it was built for
pub struct TubelyConfiguration {
    pub(crate) config: Configuration,
    pub(crate) operation: Operation,
}

/// Build a configuration from defaults, an optional file, the environment, and `overrides`
///
/// Commandline arguments are not consulted, which makes this suitable for embedding tubely or for
/// tests. `overrides` is any serializable value shaped like the configuration file.
pub fn configure_without_clap<P, T, Q>(
    config_file: Option<P>,
    overrides: T,
    save_to: Option<Q>,
) -> color_eyre::Result<TubelyConfiguration>
where
    P: AsRef<Path>,
    T: serde::Serialize,
    Q: AsRef<Path>,
{
    let config = build(config_file.as_ref().map(AsRef::as_ref), &overrides)?;

    if let Some(save_to) = save_to {
        save(&config, save_to.as_ref())?;
    }

    Ok(TubelyConfiguration {
        config,
        operation: Operation::Run,
    })
}

pub(crate) fn configure() -> color_eyre::Result<TubelyConfiguration> {
    let Output {
        config_format,
        operation,
        save_to,
        config_file,
    } = Args::parse().into_output();

    let config = build(config_file.as_deref(), &config_format)?;

    if let Some(save_to) = save_to {
        save(&config, &save_to)?;
    }

    Ok(TubelyConfiguration { config, operation })
}

fn build<T: serde::Serialize>(
    config_file: Option<&Path>,
    overrides: &T,
) -> color_eyre::Result<Configuration> {
    let mut base_config = Config::builder().add_source(Config::try_from(&Defaults::default())?);

    if let Some(path) = config_file {
        base_config = base_config.add_source(config::File::from(path));
    }

    let config: Configuration = base_config
        .add_source(config::Environment::with_prefix("TUBELY").separator("__"))
        .add_source(Config::try_from(overrides)?)
        .build()?
        .try_deserialize()?;

    Ok(config)
}

fn save(config: &Configuration, save_to: &Path) -> color_eyre::Result<()> {
    let output = toml::to_string_pretty(config)?;
    std::fs::write(save_to, output)?;

    Ok(())
}
