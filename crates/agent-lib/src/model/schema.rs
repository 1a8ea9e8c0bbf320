//! Class and attribute names of the room model

/// Run marker reset before every activation
pub const ALGORITHM_RESULT: &str = "AlgorithmResult";
pub const EXECUTION_ID: &str = "executionId";
pub const RESULT_TEMPERATURE: &str = "temperatura";
pub const RESULT_LUMINOSITY: &str = "luminosidad";

/// Room configuration singleton
pub const ROOM: &str = "Habitacion";
pub const DESIRED_TEMPERATURE: &str = "temperaturaIdealPromedio";
pub const DESIRED_LUMINOSITY: &str = "luzIdealPromedio";

/// Simulation clock singleton
pub const TIME: &str = "Tiempo";
pub const MONTH: &str = "mes";

pub const HUMIDITY_SENSOR: &str = "SensorHumedad";
pub const CO2_SENSOR: &str = "SensorCO2";
pub const SENSOR_VALUE: &str = "valor";

pub const AIR_CONDITIONER: &str = "AireAcondicionado";
pub const AIR_CONDITIONER_TEMPERATURE: &str = "temperatura";

pub const LIGHT: &str = "Luz";
pub const LIGHT_INTENSITY: &str = "intensidad";

pub const HUMIDITY_REGULATOR: &str = "ReguladorHumedad";
pub const AIR_PURIFIER: &str = "PurificadorDeAire";
pub const SWITCHED_ON: &str = "encendido";
