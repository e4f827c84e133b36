//! Built-in noise rules.
//!
//! Always present, never persisted, and restored verbatim by `reset`.
//! Coverage: browser internals, dev tooling (HMR and framework dev signals),
//! analytics providers, framework runtime warnings, and dev WebSockets.

use chrono::Utc;

use crate::rules::{Classification, MatchSpec, NoiseRule, RuleCategory};

fn console_message(id: &str, class: Classification, pattern: &str, reason: &str) -> NoiseRule {
    NoiseRule {
        id: id.to_string(),
        category: RuleCategory::Console,
        classification: class,
        matcher: MatchSpec {
            message_pattern: Some(pattern.to_string()),
            ..Default::default()
        },
        auto_detected: false,
        created_at: Utc::now(),
        reason: reason.to_string(),
    }
}

fn console_source(id: &str, class: Classification, pattern: &str, reason: &str) -> NoiseRule {
    NoiseRule {
        id: id.to_string(),
        category: RuleCategory::Console,
        classification: class,
        matcher: MatchSpec {
            source_pattern: Some(pattern.to_string()),
            ..Default::default()
        },
        auto_detected: false,
        created_at: Utc::now(),
        reason: reason.to_string(),
    }
}

fn network_url(id: &str, class: Classification, pattern: &str, reason: &str) -> NoiseRule {
    NoiseRule {
        id: id.to_string(),
        category: RuleCategory::Network,
        classification: class,
        matcher: MatchSpec {
            url_pattern: Some(pattern.to_string()),
            ..Default::default()
        },
        auto_detected: false,
        created_at: Utc::now(),
        reason: reason.to_string(),
    }
}

fn websocket_url(id: &str, class: Classification, pattern: &str, reason: &str) -> NoiseRule {
    NoiseRule {
        id: id.to_string(),
        category: RuleCategory::Websocket,
        classification: class,
        matcher: MatchSpec {
            url_pattern: Some(pattern.to_string()),
            ..Default::default()
        },
        auto_detected: false,
        created_at: Utc::now(),
        reason: reason.to_string(),
    }
}

/// The full built-in rule set, in evaluation order.
pub fn builtin_rules() -> Vec<NoiseRule> {
    let mut rules = vec![
        // Browser internals.
        network_url(
            "builtin_favicon",
            Classification::Cosmetic,
            r"/favicon\.ico",
            "Browsers request favicon.ico on every page load",
        ),
        network_url(
            "builtin_apple_touch_icon",
            Classification::Cosmetic,
            r"/apple-touch-icon(-precomposed)?\.png",
            "iOS Safari probes touch icons",
        ),
        network_url(
            "builtin_source_map",
            Classification::Cosmetic,
            r"\.map($|\?)",
            "DevTools fetch source maps",
        ),
        network_url(
            "builtin_well_known",
            Classification::Infrastructure,
            r"/\.well-known/",
            "Browser and tooling probes under /.well-known",
        ),
        network_url(
            "builtin_extension_request",
            Classification::Extension,
            r"^(chrome|moz|safari-web)-extension://",
            "Requests originating from browser extensions",
        ),
        console_source(
            "builtin_extension_source",
            Classification::Extension,
            r"^(chrome|moz|safari-web)-extension://",
            "Console output from browser extensions",
        ),
        console_source(
            "builtin_content_script",
            Classification::Extension,
            r"content[-_]?script",
            "Extension content scripts",
        ),
        // CORS preflights: OPTIONS with a 2xx is handshake traffic.
        NoiseRule {
            id: "builtin_cors_preflight".to_string(),
            category: RuleCategory::Network,
            classification: Classification::Infrastructure,
            matcher: MatchSpec {
                method: Some("OPTIONS".to_string()),
                status_min: Some(200),
                status_max: Some(299),
                ..Default::default()
            },
            auto_detected: false,
            created_at: Utc::now(),
            reason: "Successful CORS preflight requests".to_string(),
        },
        // Dev tooling: HMR and bundler chatter.
        console_message(
            "builtin_hmr_console",
            Classification::Framework,
            r"\[HMR\]",
            "Hot module replacement log lines",
        ),
        network_url(
            "builtin_hmr_update",
            Classification::Framework,
            r"hot-update\.(js|json)",
            "Webpack hot-update payloads",
        ),
        network_url(
            "builtin_webpack_hmr",
            Classification::Framework,
            r"/__webpack_hmr",
            "Webpack HMR event stream",
        ),
        console_message(
            "builtin_webpack_dev_server",
            Classification::Framework,
            r"\[webpack-dev-server\]",
            "webpack-dev-server status lines",
        ),
        console_message(
            "builtin_vite_console",
            Classification::Framework,
            r"\[vite\]",
            "Vite dev client log lines",
        ),
        network_url(
            "builtin_vite_client",
            Classification::Framework,
            r"/@(vite|id|fs)/",
            "Vite dev-server module requests",
        ),
        network_url(
            "builtin_sockjs_node",
            Classification::Infrastructure,
            r"/sockjs-node/",
            "webpack-dev-server SockJS transport",
        ),
        console_message(
            "builtin_parcel_hmr",
            Classification::Framework,
            r"\[parcel\]",
            "Parcel dev client log lines",
        ),
        console_message(
            "builtin_fast_refresh",
            Classification::Framework,
            r"Fast Refresh",
            "React Fast Refresh status lines",
        ),
        // Framework dev signals and runtime warnings.
        console_message(
            "builtin_react_devtools",
            Classification::Framework,
            r"Download the React DevTools",
            "React development-build banner",
        ),
        console_message(
            "builtin_react_dev_mode",
            Classification::Framework,
            r"React is running in (development|production) mode",
            "React mode banner",
        ),
        console_message(
            "builtin_react_key_warning",
            Classification::Framework,
            r#"unique "key" prop"#,
            "React list-key development warning",
        ),
        console_message(
            "builtin_react_strict_mode",
            Classification::Framework,
            r"StrictMode",
            "React StrictMode double-invoke notices",
        ),
        console_message(
            "builtin_vue_devtools",
            Classification::Framework,
            r"Download the Vue Devtools",
            "Vue development-build banner",
        ),
        console_message(
            "builtin_vue_dev_mode",
            Classification::Framework,
            r"You are running a development build of Vue",
            "Vue dev-build banner",
        ),
        console_message(
            "builtin_angular_dev_mode",
            Classification::Framework,
            r"Angular is running in development mode",
            "Angular dev-mode banner",
        ),
        console_message(
            "builtin_svelte_hmr",
            Classification::Framework,
            r"\[svelte\]",
            "Svelte HMR log lines",
        ),
        console_message(
            "builtin_next_dev",
            Classification::Framework,
            r"\[next\]",
            "Next.js dev log lines",
        ),
        console_message(
            "builtin_nuxt_dev",
            Classification::Framework,
            r"\[nuxt\]",
            "Nuxt dev log lines",
        ),
        console_message(
            "builtin_lit_dev_mode",
            Classification::Framework,
            r"Lit is in dev mode",
            "Lit dev-mode banner",
        ),
        console_message(
            "builtin_ember_debug",
            Classification::Framework,
            r"DEBUG: Ember",
            "Ember debug banner",
        ),
        // Next.js / framework internals over the network.
        network_url(
            "builtin_next_internal",
            Classification::Framework,
            r"/_next/(static|webpack-hmr|image)",
            "Next.js internal asset and HMR traffic",
        ),
        network_url(
            "builtin_nuxt_internal",
            Classification::Framework,
            r"/_nuxt/",
            "Nuxt internal asset traffic",
        ),
        // Analytics providers.
        network_url(
            "builtin_google_analytics",
            Classification::Analytics,
            r"(google-analytics\.com|analytics\.google\.com|/gtag/js|/collect\?v=)",
            "Google Analytics beacons",
        ),
        network_url(
            "builtin_gtm",
            Classification::Analytics,
            r"googletagmanager\.com",
            "Google Tag Manager",
        ),
        network_url(
            "builtin_segment",
            Classification::Analytics,
            r"(api\.segment\.io|cdn\.segment\.com)",
            "Segment beacons",
        ),
        network_url(
            "builtin_mixpanel",
            Classification::Analytics,
            r"(api\.mixpanel\.com|cdn\.mxpnl\.com)",
            "Mixpanel beacons",
        ),
        network_url(
            "builtin_hotjar",
            Classification::Analytics,
            r"(hotjar\.com|hotjar\.io)",
            "Hotjar recordings and beacons",
        ),
        network_url(
            "builtin_amplitude",
            Classification::Analytics,
            r"(api\.amplitude\.com|cdn\.amplitude\.com)",
            "Amplitude beacons",
        ),
        network_url(
            "builtin_plausible",
            Classification::Analytics,
            r"plausible\.io/api/event",
            "Plausible beacons",
        ),
        network_url(
            "builtin_posthog",
            Classification::Analytics,
            r"(posthog\.com|/ingest/)",
            "PostHog beacons",
        ),
        network_url(
            "builtin_datadog_rum",
            Classification::Analytics,
            r"(browser-intake-datadoghq\.com|datadoghq-browser-agent\.com)",
            "Datadog RUM intake",
        ),
        network_url(
            "builtin_sentry",
            Classification::Analytics,
            r"(ingest\.sentry\.io|sentry-cdn\.com|/envelope/\?sentry_key=)",
            "Sentry envelopes",
        ),
        network_url(
            "builtin_logrocket",
            Classification::Analytics,
            r"(logrocket\.(com|io)|lr-ingest\.io|lr-in\.com)",
            "LogRocket ingestion",
        ),
        network_url(
            "builtin_fullstory",
            Classification::Analytics,
            r"fullstory\.com",
            "FullStory recordings",
        ),
        network_url(
            "builtin_heap",
            Classification::Analytics,
            r"heapanalytics\.com",
            "Heap beacons",
        ),
        console_source(
            "builtin_analytics_script",
            Classification::Analytics,
            r"(gtag|gtm|analytics|segment|mixpanel)\.js",
            "Console output from analytics scripts",
        ),
        // Cosmetic console noise.
        console_message(
            "builtin_devtools_warning",
            Classification::Cosmetic,
            r"Don't paste code into the DevTools console",
            "Self-XSS console warning",
        ),
        console_message(
            "builtin_deprecation_listener",
            Classification::Cosmetic,
            r"Added non-passive event listener",
            "Passive-listener performance hint",
        ),
        console_message(
            "builtin_autocomplete_hint",
            Classification::Cosmetic,
            r"Input elements should have autocomplete attributes",
            "Autocomplete DOM hint",
        ),
        // Dev WebSockets.
        websocket_url(
            "builtin_ws_vite",
            Classification::Framework,
            r"(vite-hmr|/@vite)",
            "Vite HMR socket",
        ),
        websocket_url(
            "builtin_ws_webpack",
            Classification::Framework,
            r"(/ws$|sockjs-node|__webpack_hmr)",
            "webpack-dev-server socket",
        ),
        websocket_url(
            "builtin_ws_next",
            Classification::Framework,
            r"/_next/webpack-hmr",
            "Next.js HMR socket",
        ),
        websocket_url(
            "builtin_ws_livereload",
            Classification::Framework,
            r"livereload",
            "LiveReload socket",
        ),
    ];

    // Health/infra endpoints are noisy under local polling.
    rules.push(network_url(
        "builtin_health_checks",
        Classification::Infrastructure,
        r"/(health|healthz|ping|ready|readyz|livez)($|\?)",
        "Health and readiness probes",
    ));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CompiledRule;

    #[test]
    fn test_builtin_ids_unique_and_prefixed() {
        let rules = builtin_rules();
        let mut seen = std::collections::HashSet::new();
        for rule in &rules {
            assert!(rule.is_builtin(), "{} must carry the builtin prefix", rule.id);
            assert!(seen.insert(rule.id.clone()), "duplicate id {}", rule.id);
        }
        assert!(rules.len() >= 45, "expected a substantial built-in set, got {}", rules.len());
    }

    #[test]
    fn test_all_builtin_patterns_compile() {
        for rule in builtin_rules() {
            let compiled = CompiledRule::compile(rule);
            assert!(
                compiled.fully_compiled(),
                "builtin {} has a non-compiling pattern",
                compiled.rule.id
            );
        }
    }

    #[test]
    fn test_builtin_patterns_pass_safety_guard() {
        for rule in builtin_rules() {
            assert!(rule.validate().is_ok(), "builtin {} fails the safety guard", rule.id);
        }
    }
}
