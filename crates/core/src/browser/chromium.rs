//! [`Driver`] backed by a local Chromium over the DevTools protocol.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{Browser, Driver, Page};
use crate::config::LaunchConfig;
use crate::error::{Error, Result};

/// Switches every launch gets; the dashboard is served over TLS we do not vet.
const DEFAULT_ARGS: [&str; 2] = ["--disable-setuid-sandbox", "--ignore-certificate-errors"];

/// Upper bound on waiting for the browser process after close.
const EXIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumDriver;

#[async_trait]
impl Driver for ChromiumDriver {
	async fn launch(&self, options: &LaunchConfig) -> Result<Box<dyn Browser>> {
		let mut builder = BrowserConfig::builder().no_sandbox();
		if !options.headless {
			builder = builder.with_head();
		}
		if let Some(path) = &options.executable {
			builder = builder.chrome_executable(path);
		}
		for arg in DEFAULT_ARGS.iter().copied().map(str::to_string).chain(options.args.iter().cloned()) {
			builder = builder.arg(arg);
		}
		let config = builder.build().map_err(Error::BrowserLaunch)?;

		let (browser, mut handler) = CdpBrowser::launch(config)
			.await
			.map_err(|e| Error::BrowserLaunch(e.to_string()))?;

		// The handler must be polled for any command to make progress; it ends
		// when the websocket closes.
		let events = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if let Err(err) = event {
					trace!(target = "geowatch.cdp", error = %err, "devtools handler event error");
				}
			}
			debug!(target = "geowatch.cdp", "devtools connection closed");
		});

		Ok(Box::new(ChromiumBrowser {
			inner: Mutex::new(browser),
			events,
		}))
	}
}

struct ChromiumBrowser {
	inner: Mutex<CdpBrowser>,
	events: JoinHandle<()>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
	async fn new_page(&self) -> Result<Arc<dyn Page>> {
		let page = self
			.inner
			.lock()
			.await
			.new_page("about:blank")
			.await
			.map_err(|e| Error::Protocol(e.to_string()))?;
		Ok(Arc::new(ChromiumPage { page }))
	}

	async fn close(&self) -> Result<()> {
		let mut browser = self.inner.lock().await;
		let closed = browser.close().await.map_err(|e| Error::Protocol(e.to_string()));
		if closed.is_err() {
			if let Some(Err(err)) = browser.kill().await {
				debug!(target = "geowatch.cdp", error = %err, "killing browser process failed");
			}
		}
		match tokio::time::timeout(EXIT_TIMEOUT, browser.wait()).await {
			Ok(Ok(_)) => {}
			Ok(Err(err)) => debug!(target = "geowatch.cdp", error = %err, "browser process did not exit cleanly"),
			Err(_) => debug!(
				target = "geowatch.cdp",
				timeout_ms = EXIT_TIMEOUT.as_millis() as u64,
				"gave up waiting for browser process to exit"
			),
		}
		self.events.abort();
		closed.map(|_| ())
	}
}

impl Drop for ChromiumBrowser {
	fn drop(&mut self) {
		self.events.abort();
	}
}

struct ChromiumPage {
	page: chromiumoxide::Page,
}

#[async_trait]
impl Page for ChromiumPage {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		match tokio::time::timeout(timeout, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(e)) => Err(Error::Navigation {
				url: url.to_string(),
				reason: e.to_string(),
			}),
			Err(_) => Err(Error::timeout(timeout, format!("navigation to {url}"))),
		}
	}

	async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
		let element = self
			.page
			.find_element(selector)
			.await
			.map_err(|_| Error::ElementNotFound {
				selector: selector.to_string(),
			})?;
		element
			.click()
			.await
			.map_err(|e| Error::Protocol(e.to_string()))?
			.type_str(text)
			.await
			.map_err(|e| Error::Protocol(e.to_string()))?;
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		let params = EvaluateParams::builder()
			.expression(expression)
			.return_by_value(true)
			.build()
			.map_err(Error::JsEval)?;
		let result = self
			.page
			.evaluate_expression(params)
			.await
			.map_err(|e| Error::JsEval(e.to_string()))?;
		result.into_value::<Value>().map_err(|e| Error::JsEval(e.to_string()))
	}
}
