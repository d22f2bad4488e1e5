//! Scripted browser doubles for exercising the session manager without Chromium.
//!
//! [`ScriptedDriver`] hands out browsers and pages that share one script: which
//! step should fail, what the dashboard's remote calls last delivered, and how
//! long each step takes. Every call is recorded for assertions.
//!
//! # Example
//!
//! ```ignore
//! use geowatch::testing::{ScriptedDriver, Step};
//!
//! let driver = ScriptedDriver::new();
//! driver.fail_at(Step::Goto);
//! let monitor = Monitor::new(MonitorConfig::default(), driver.driver());
//! monitor.setup("K1").await;
//! assert_eq!(driver.launches(), 1);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::{Browser, Driver, Page};
use crate::config::LaunchConfig;
use crate::error::{Error, Result};
use crate::js;

/// Dashboard flow step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
	Launch,
	NewPage,
	Goto,
	WaitForFunction,
	TypeText,
	WaitForSelector,
	TapInstall,
	TapRead,
}

/// Call recorded by the scripted doubles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
	Launch,
	NewPage,
	Goto { url: String },
	WaitForFunction { predicate: String },
	WaitForSelector { selector: String },
	TypeText { selector: String, text: String },
	Evaluate { expression: String },
	Close,
}

#[derive(Default)]
struct Script {
	failures: HashSet<Step>,
	remote_calls_unavailable: bool,
	telemetry: Option<Value>,
	uptime: Option<Value>,
	step_delay: Duration,
	read_delay: Duration,
	launches: usize,
	opened: usize,
	closes: usize,
	actions: Vec<MockAction>,
}

/// Driver whose browsers and pages follow a shared, mutable script.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
	script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns this driver as the trait object the monitor expects.
	pub fn driver(&self) -> Arc<dyn Driver> {
		Arc::new(self.clone())
	}

	/// A page bound to this script without going through a launch.
	pub fn page(&self) -> Arc<dyn Page> {
		Arc::new(ScriptedPage {
			script: Arc::clone(&self.script),
		})
	}

	/// Makes `step` fail until [`clear_failures`](Self::clear_failures).
	pub fn fail_at(&self, step: Step) {
		self.script.lock().unwrap().failures.insert(step);
	}

	pub fn clear_failures(&self) {
		self.script.lock().unwrap().failures.clear();
	}

	/// Controls whether pages expose a Meteor connection for the tap.
	pub fn set_remote_calls_available(&self, available: bool) {
		self.script.lock().unwrap().remote_calls_unavailable = !available;
	}

	/// Simulates the dashboard delivering a `getRealData` result.
	pub fn push_telemetry(&self, telemetry: Value) {
		self.script.lock().unwrap().telemetry = Some(telemetry);
	}

	/// Simulates the dashboard delivering a `getOnLine3DayMiners` result.
	pub fn push_uptime(&self, uptime: Value) {
		self.script.lock().unwrap().uptime = Some(uptime);
	}

	/// Delay applied to launch and navigation.
	pub fn set_step_delay(&self, delay: Duration) {
		self.script.lock().unwrap().step_delay = delay;
	}

	/// Delay applied to each tap read.
	pub fn set_read_delay(&self, delay: Duration) {
		self.script.lock().unwrap().read_delay = delay;
	}

	/// Launch attempts, including failed ones.
	pub fn launches(&self) -> usize {
		self.script.lock().unwrap().launches
	}

	pub fn closes(&self) -> usize {
		self.script.lock().unwrap().closes
	}

	/// Browsers launched and not yet closed.
	pub fn open_browsers(&self) -> usize {
		let script = self.script.lock().unwrap();
		script.opened - script.closes
	}

	pub fn actions(&self) -> Vec<MockAction> {
		self.script.lock().unwrap().actions.clone()
	}
}

fn record(script: &Mutex<Script>, action: MockAction) {
	script.lock().unwrap().actions.push(action);
}

fn fails(script: &Mutex<Script>, step: Step) -> bool {
	script.lock().unwrap().failures.contains(&step)
}

async fn delay(script: &Mutex<Script>) {
	let delay = script.lock().unwrap().step_delay;
	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}
}

async fn read_delay(script: &Mutex<Script>) {
	let delay = script.lock().unwrap().read_delay;
	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}
}

#[async_trait]
impl Driver for ScriptedDriver {
	async fn launch(&self, _options: &LaunchConfig) -> Result<Box<dyn Browser>> {
		record(&self.script, MockAction::Launch);
		self.script.lock().unwrap().launches += 1;
		delay(&self.script).await;
		if fails(&self.script, Step::Launch) {
			return Err(Error::BrowserLaunch("scripted launch failure".to_string()));
		}
		self.script.lock().unwrap().opened += 1;
		Ok(Box::new(ScriptedBrowser {
			script: Arc::clone(&self.script),
		}))
	}
}

struct ScriptedBrowser {
	script: Arc<Mutex<Script>>,
}

#[async_trait]
impl Browser for ScriptedBrowser {
	async fn new_page(&self) -> Result<Arc<dyn Page>> {
		record(&self.script, MockAction::NewPage);
		if fails(&self.script, Step::NewPage) {
			return Err(Error::Protocol("scripted page failure".to_string()));
		}
		Ok(Arc::new(ScriptedPage {
			script: Arc::clone(&self.script),
		}))
	}

	async fn close(&self) -> Result<()> {
		record(&self.script, MockAction::Close);
		self.script.lock().unwrap().closes += 1;
		Ok(())
	}
}

struct ScriptedPage {
	script: Arc<Mutex<Script>>,
}

impl ScriptedPage {
	fn tap_reading(&self) -> Value {
		let script = self.script.lock().unwrap();
		let Some(telemetry) = script.telemetry.clone() else {
			return Value::String("null".to_string());
		};
		let combined = match telemetry {
			Value::Object(mut fields) => {
				fields.insert("hourly".to_string(), script.uptime.clone().unwrap_or(Value::Null));
				Value::Object(fields)
			}
			other => other,
		};
		Value::String(combined.to_string())
	}
}

#[async_trait]
impl Page for ScriptedPage {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		record(&self.script, MockAction::Goto { url: url.to_string() });
		delay(&self.script).await;
		if fails(&self.script, Step::Goto) {
			return Err(Error::timeout(timeout, format!("navigation to {url}")));
		}
		Ok(())
	}

	async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
		record(
			&self.script,
			MockAction::TypeText {
				selector: selector.to_string(),
				text: text.to_string(),
			},
		);
		if fails(&self.script, Step::TypeText) {
			return Err(Error::ElementNotFound {
				selector: selector.to_string(),
			});
		}
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		record(
			&self.script,
			MockAction::Evaluate {
				expression: expression.to_string(),
			},
		);
		if expression == js::TAP_READ {
			read_delay(&self.script).await;
			if fails(&self.script, Step::TapRead) {
				return Err(Error::Protocol("target closed".to_string()));
			}
			return Ok(self.tap_reading());
		}
		if expression.contains("Meteor.call") {
			let script = self.script.lock().unwrap();
			let installed = !script.remote_calls_unavailable && !script.failures.contains(&Step::TapInstall);
			return Ok(Value::Bool(installed));
		}
		Ok(Value::Bool(true))
	}

	async fn wait_for_function(&self, predicate: &str, timeout: Duration) -> Result<()> {
		record(
			&self.script,
			MockAction::WaitForFunction {
				predicate: predicate.to_string(),
			},
		);
		if fails(&self.script, Step::WaitForFunction) {
			return Err(Error::timeout(timeout, predicate));
		}
		Ok(())
	}

	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		record(
			&self.script,
			MockAction::WaitForSelector {
				selector: selector.to_string(),
			},
		);
		if fails(&self.script, Step::WaitForSelector) {
			return Err(Error::timeout(timeout, selector));
		}
		Ok(())
	}
}
