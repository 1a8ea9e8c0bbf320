//! Typed room capabilities over the dynamic object model

use super::schema;
use super::{AttrValue, ObjectId, ObjectModel};
use crate::error::{ModelError, PredictionError};
use crate::models::PredictionResult;
use tracing::warn;

/// One method per logical field of the room model
///
/// Implemented for every [`ObjectModel`], including trait objects. Reads
/// return the precise [`PredictionError`] naming the missing class or
/// attribute; group writes return how many objects were updated.
pub trait RoomModel: ObjectModel {
    /// Singleton room configuration object
    fn room_configuration(&self) -> Result<ObjectId, PredictionError> {
        singleton(self, schema::ROOM)
    }

    fn desired_temperature(&self, room: &str) -> Result<f64, PredictionError> {
        self.real_attribute(room, schema::DESIRED_TEMPERATURE)
            .ok_or(PredictionError::MissingAttribute {
                class: schema::ROOM,
                attribute: schema::DESIRED_TEMPERATURE,
            })
    }

    fn desired_luminosity(&self, room: &str) -> Result<f64, PredictionError> {
        self.real_attribute(room, schema::DESIRED_LUMINOSITY)
            .ok_or(PredictionError::MissingAttribute {
                class: schema::ROOM,
                attribute: schema::DESIRED_LUMINOSITY,
            })
    }

    /// Month of the simulation clock
    fn prediction_month(&self) -> Result<i64, PredictionError> {
        let time = singleton(self, schema::TIME)?;
        self.integer_attribute(&time, schema::MONTH)
            .ok_or(PredictionError::MissingAttribute {
                class: schema::TIME,
                attribute: schema::MONTH,
            })
    }

    fn current_humidity(&self) -> Result<f64, PredictionError> {
        sensor_value(self, schema::HUMIDITY_SENSOR)
    }

    fn current_co2(&self) -> Result<f64, PredictionError> {
        sensor_value(self, schema::CO2_SENSOR)
    }

    /// Mark every `AlgorithmResult` stale for a new execution
    ///
    /// A failing object does not stop the others from being reset; the first
    /// error is returned once every object was tried.
    fn reset_algorithm_results(&self, execution_id: &str) -> Result<usize, ModelError> {
        let mut reset = 0;
        let mut first_error = None;
        for obj in self.objects_of_class(schema::ALGORITHM_RESULT) {
            let writes = [
                (schema::EXECUTION_ID, AttrValue::from(execution_id)),
                (schema::RESULT_TEMPERATURE, AttrValue::Integer(0)),
                (schema::RESULT_LUMINOSITY, AttrValue::Integer(0)),
            ]
            .map(|(attribute, value)| (obj.clone(), attribute, value));
            match write_checked(self, writes) {
                Ok(_) => reset += 1,
                Err(e) => {
                    warn!(object = %obj, error = %e, "Could not reset algorithm result");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(reset),
        }
    }

    /// Write a prediction to every actuator group, or to nothing at all
    ///
    /// Returns how many objects were updated. Classes without instances are
    /// skipped.
    fn apply_prediction(&self, result: &PredictionResult) -> Result<usize, ModelError> {
        let groups = [
            (
                schema::AIR_CONDITIONER,
                schema::AIR_CONDITIONER_TEMPERATURE,
                AttrValue::Integer(result.temperature),
            ),
            (
                schema::LIGHT,
                schema::LIGHT_INTENSITY,
                AttrValue::Integer(result.luminosity),
            ),
            (
                schema::HUMIDITY_REGULATOR,
                schema::SWITCHED_ON,
                AttrValue::Boolean(result.humidifier_on),
            ),
            (
                schema::AIR_PURIFIER,
                schema::SWITCHED_ON,
                AttrValue::Boolean(result.air_purifier_on),
            ),
        ];
        let writes: Vec<_> = groups
            .into_iter()
            .flat_map(|(class, attribute, value)| {
                self.objects_of_class(class)
                    .into_iter()
                    .map(move |obj| (obj, attribute, value.clone()))
            })
            .collect();
        write_checked(self, writes)
    }
}

impl<M: ObjectModel + ?Sized> RoomModel for M {}

fn singleton<M: ObjectModel + ?Sized>(
    model: &M,
    class: &'static str,
) -> Result<ObjectId, PredictionError> {
    model
        .any_object_of_class(class)
        .ok_or(PredictionError::MissingObject { class })
}

fn sensor_value<M: ObjectModel + ?Sized>(
    model: &M,
    class: &'static str,
) -> Result<f64, PredictionError> {
    let sensor = singleton(model, class)?;
    model
        .real_attribute(&sensor, schema::SENSOR_VALUE)
        .ok_or(PredictionError::MissingAttribute {
            class,
            attribute: schema::SENSOR_VALUE,
        })
}

/// Check every write before performing the first one
fn write_checked<M, I>(model: &M, writes: I) -> Result<usize, ModelError>
where
    M: ObjectModel + ?Sized,
    I: IntoIterator<Item = (ObjectId, &'static str, AttrValue)>,
{
    let writes: Vec<_> = writes.into_iter().collect();
    for (obj, attribute, value) in &writes {
        model.check_attribute(obj, attribute, value)?;
    }
    let count = writes.len();
    for (obj, attribute, value) in writes {
        model.set_attribute(&obj, attribute, value)?;
    }
    Ok(count)
}
