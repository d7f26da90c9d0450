//! Shared test helpers for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fieldsync_engine::{
    EngineConfig, GatewayError, GatewayResult, ReconciliationEngine, RemoteFieldGateway,
};
use fieldsync_types::{FieldConfiguration, FieldDescriptor, FieldType, Properties, TableRef};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Failure modes the fake gateway can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    Server,
    RateLimited,
    Unauthorized,
    Validation,
}

impl Failure {
    pub fn to_error(self) -> GatewayError {
        match self {
            Failure::Network => GatewayError::Network("connection reset".into()),
            Failure::Server => GatewayError::Server {
                status: 503,
                message: "service unavailable".into(),
            },
            Failure::RateLimited => GatewayError::RateLimited {
                retry_after_secs: None,
            },
            Failure::Unauthorized => GatewayError::Unauthorized("token expired".into()),
            Failure::Validation => GatewayError::Validation("bad property".into()),
        }
    }
}

/// In-memory gateway for a single table with call counters and failure injection.
#[derive(Default)]
pub struct FakeGateway {
    fields: Mutex<Vec<FieldDescriptor>>,
    next_id: AtomicU32,
    list_calls: AtomicU32,
    create_calls: AtomicU32,
    update_calls: AtomicU32,
    scripted: Mutex<HashMap<&'static str, VecDeque<Failure>>>,
    poisoned: Mutex<HashMap<String, Failure>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: Vec<FieldDescriptor>) -> Self {
        let gateway = Self::default();
        *gateway.fields.lock().unwrap() = fields;
        gateway
    }

    /// Fails the next `times` calls of `operation` with `failure`.
    pub fn fail_next(&self, operation: &'static str, failure: Failure, times: usize) {
        let mut scripted = self.scripted.lock().unwrap();
        let queue = scripted.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(failure, times));
    }

    /// Every create/update of the named field fails with `failure`.
    pub fn poison(&self, field_name: &str, failure: Failure) {
        self.poisoned
            .lock()
            .unwrap()
            .insert(field_name.to_string(), failure);
    }

    pub fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.lock().unwrap().clone()
    }

    /// Mutates the live schema behind the engine's back.
    pub fn replace_field(&self, field: FieldDescriptor) {
        let mut fields = self.fields.lock().unwrap();
        fields.retain(|f| f.id != field.id);
        fields.push(field);
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self, operation: &'static str) -> Option<GatewayError> {
        self.scripted
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
            .map(Failure::to_error)
    }

    fn poisoned_failure(&self, name: &str) -> Option<GatewayError> {
        self.poisoned
            .lock()
            .unwrap()
            .get(name)
            .map(|f| f.to_error())
    }

    /// Mimics the service: assigns option ids and fills in the default UI type.
    fn materialize(&self, id: String, config: &FieldConfiguration, is_primary: bool) -> FieldDescriptor {
        let mut properties = config.properties.clone();
        if let Some(Value::Array(options)) = properties.get_mut("options") {
            for (i, option) in options.iter_mut().enumerate() {
                if let Value::Object(obj) = option {
                    obj.entry("id").or_insert_with(|| json!(format!("opt{i}")));
                    obj.entry("color").or_insert_with(|| json!(i));
                }
            }
        }
        let ui_type = if config.ui_type.is_empty() {
            FieldType::from_code(config.type_code)
                .default_ui_type()
                .to_string()
        } else {
            config.ui_type.clone()
        };
        FieldDescriptor {
            id,
            name: config.name.clone(),
            type_code: config.type_code,
            ui_type,
            is_primary,
            properties,
            description: config.description.clone(),
        }
    }
}

#[async_trait]
impl RemoteFieldGateway for FakeGateway {
    fn provider_name(&self) -> &'static str {
        "Fake"
    }

    async fn list_fields(&self, _table: &TableRef) -> GatewayResult<Vec<FieldDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.scripted_failure("list_fields") {
            return Err(error);
        }
        Ok(self.fields())
    }

    async fn create_field(
        &self,
        _table: &TableRef,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .scripted_failure("create_field")
            .or_else(|| self.poisoned_failure(&config.name))
        {
            return Err(error);
        }
        let mut fields = self.fields.lock().unwrap();
        if fields.iter().any(|f| f.name == config.name) {
            return Err(GatewayError::Validation(format!(
                "field name '{}' already exists",
                config.name
            )));
        }
        let id = format!("fld{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let field = self.materialize(id, config, fields.is_empty());
        fields.push(field.clone());
        Ok(field)
    }

    async fn update_field(
        &self,
        _table: &TableRef,
        field_id: &str,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .scripted_failure("update_field")
            .or_else(|| self.poisoned_failure(&config.name))
        {
            return Err(error);
        }
        let mut fields = self.fields.lock().unwrap();
        let Some(slot) = fields.iter_mut().find(|f| f.id == field_id) else {
            return Err(GatewayError::NotFound(format!("field {field_id}")));
        };
        let updated = self.materialize(field_id.to_string(), config, slot.is_primary);
        *slot = updated.clone();
        Ok(updated)
    }
}

pub fn table() -> TableRef {
    TableRef::new("bascnBooks", "tblReading")
}

/// Engine with tiny backoff so retry tests stay fast.
pub fn engine(gateway: Arc<FakeGateway>) -> ReconciliationEngine {
    let config = EngineConfig {
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 100,
        ..Default::default()
    };
    ReconciliationEngine::new(gateway, config)
}

pub fn descriptor(
    id: &str,
    name: &str,
    type_code: i32,
    ui_type: &str,
    properties: Value,
) -> FieldDescriptor {
    let properties: Properties = match properties {
        Value::Object(map) => map,
        _ => Properties::new(),
    };
    FieldDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        type_code,
        ui_type: ui_type.to_string(),
        is_primary: false,
        properties,
        description: None,
    }
}

/// `Status` single select with `Want` and `Read`.
pub fn status_config() -> FieldConfiguration {
    FieldConfiguration::single_select("Status", ["Want", "Read"])
}

pub fn status_descriptor() -> FieldDescriptor {
    descriptor(
        "fldStatus",
        "Status",
        3,
        "SingleSelect",
        json!({"options": [{"name": "Want"}, {"name": "Read"}]}),
    )
}
