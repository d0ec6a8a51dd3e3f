use serde_json::{Map, Value};

/// A record pushed onto the data layer: `{event: name, ...params}`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GtmEvent {
    pub name: String,
    pub params: Map<String, Value>,
}

impl GtmEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    /// Flattens the event into the object GTM reads. Parameters are spread after the `event`
    /// key, so a parameter named `event` replaces it.
    pub fn to_value(&self) -> Value {
        let mut record = Map::with_capacity(self.params.len() + 1);
        record.insert("event".to_string(), Value::String(self.name.clone()));
        for (key, value) in &self.params {
            record.insert(key.clone(), value.clone());
        }
        Value::Object(record)
    }
}

/// Second argument of `gtag('consent', ...)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentDirective {
    Default,
    Update,
}

impl ConsentDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDirective::Default => "default",
            ConsentDirective::Update => "update",
        }
    }
}

/// Argument list for `gtag('consent', directive, settings)`.
pub fn consent_command(directive: ConsentDirective, settings: Map<String, Value>) -> Vec<Value> {
    vec![
        Value::String("consent".to_string()),
        Value::String(directive.as_str().to_string()),
        Value::Object(settings),
    ]
}

/// Returns `(directive, settings)` when `entry` is a queued `gtag('consent', ...)` call.
pub fn as_consent_command(entry: &Value) -> Option<(ConsentDirective, &Map<String, Value>)> {
    let args = entry.as_array()?;
    if args.first()?.as_str()? != "consent" {
        return None;
    }
    let directive = match args.get(1)?.as_str()? {
        "default" => ConsentDirective::Default,
        "update" => ConsentDirective::Update,
        _ => return None,
    };
    Some((directive, args.get(2)?.as_object()?))
}
