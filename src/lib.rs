pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod polisen_client;
pub mod services;

use std::sync::Arc;

use polisen_client::{EventSource, PolisenClient};
use services::{locations::LocationDirectory, sensor::Sensor};

// Shared state для всего приложения
pub struct AppState<S: EventSource = PolisenClient> {
    pub sensors: Vec<Arc<Sensor<S>>>,
    pub locations: LocationDirectory<S>,
}

impl<S: EventSource> AppState<S> {
    pub fn new(sensors: Vec<Arc<Sensor<S>>>, locations: LocationDirectory<S>) -> Arc<Self> {
        Arc::new(Self { sensors, locations })
    }

    pub fn sensor(&self, name: &str) -> Option<&Arc<Sensor<S>>> {
        self.sensors.iter().find(|s| s.name() == name)
    }

    pub fn shutdown(&self) {
        for sensor in &self.sensors {
            sensor.shutdown();
        }
    }
}

impl AppState<PolisenClient> {
    /// Builds one sensor per validated config, all sharing a single client.
    pub fn from_config(config: &config::Config) -> anyhow::Result<Arc<Self>> {
        config.validate_upstream()?;
        let sensor_configs = config.sensor_configs()?;

        let http_client = PolisenClient::build_http_client(&config.upstream)?;
        let client = Arc::new(PolisenClient::new(http_client.clone(), &config.upstream));

        let sensors = sensor_configs
            .into_iter()
            .map(|sensor_config| Arc::new(Sensor::new(sensor_config, client.clone())))
            .collect();
        let locations = LocationDirectory::new(http_client, &config.upstream, client);

        Ok(Self::new(sensors, locations))
    }
}
