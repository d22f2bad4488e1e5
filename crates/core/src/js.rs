//! JavaScript snippets evaluated inside dashboard pages.
//!
//! Every script is a self-invoking expression that returns a primitive, so
//! results survive the DevTools round trip without object handles. Caller
//! input is embedded as JSON string literals.

/// Page-global holding the tap's captured payloads.
pub const TAP_GLOBAL: &str = "__geowatchTap";

/// Reads the tap slots as a JSON string: `"null"` until telemetry has been
/// captured, otherwise the telemetry object with the uptime payload under `hourly`.
pub const TAP_READ: &str = r#"(() => {
        const tap = window.__geowatchTap || {};
        if (tap.telemetry == null) return JSON.stringify(null);
        return JSON.stringify(Object.assign({}, tap.telemetry, {
            hourly: tap.uptime == null ? null : tap.uptime
        }));
    })()"#;

fn literal(value: &str) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// `true` once an element matching `selector` is attached.
pub fn element_present(selector: &str) -> String {
	format!("document.querySelector({}) !== null", literal(selector))
}

/// `true` when the element matching `selector` is absent or hidden.
pub fn absent_or_hidden(selector: &str) -> String {
	let selector = literal(selector);
	format!(
		r#"(() => {{
                const el = document.querySelector({selector});
                return !el || el.style.display === 'none';
            }})()"#
	)
}

/// Clicks the first cell of the first `row_selector` row whose first cell
/// contains `key`. Evaluates to whether a row was found.
pub fn click_row_containing(row_selector: &str, key: &str) -> String {
	let row_selector = literal(row_selector);
	let key = literal(key);
	format!(
		r#"(() => {{
                for (const row of document.querySelectorAll({row_selector})) {{
                    const cell = row.firstElementChild;
                    if (cell && cell.textContent.includes({key})) {{
                        cell.click();
                        return true;
                    }}
                }}
                return false;
            }})()"#
	)
}

/// Wraps `Meteor.call` so completions of the mapped methods are copied into
/// [`TAP_GLOBAL`] slots.
///
/// `slots` maps remote method name to slot name. The original callback still
/// receives the original `(error, result)`, and promise-style calls get the
/// original promise back. Evaluates to `false` when the page has no Meteor
/// connection, `true` once the wrapper is in place. Installing twice is a no-op.
pub fn tap_install(slots: &[(&str, &str)]) -> String {
	let map: serde_json::Map<String, serde_json::Value> = slots
		.iter()
		.map(|(method, slot)| (method.to_string(), serde_json::Value::from(*slot)))
		.collect();
	let slots = serde_json::Value::Object(map);
	format!(
		r#"(() => {{
                if (typeof Meteor === 'undefined' || !Meteor.connection) return false;
                if (window.{TAP_GLOBAL}) return true;
                const slots = {slots};
                const tap = {{}};
                window.{TAP_GLOBAL} = tap;
                const originalCall = Meteor.call;
                Meteor.call = function (name, ...args) {{
                    const slot = slots[name];
                    const last = args[args.length - 1];
                    if (slot && typeof last === 'function') {{
                        args[args.length - 1] = function (error, result) {{
                            tap[slot] = result;
                            return last.apply(this, arguments);
                        }};
                        return originalCall.call(this, name, ...args);
                    }}
                    const outcome = originalCall.call(this, name, ...args);
                    if (slot && outcome && typeof outcome.then === 'function') {{
                        outcome.then(result => {{ tap[slot] = result; }}, () => {{}});
                    }}
                    return outcome;
                }};
                return true;
            }})()"#
	)
}
