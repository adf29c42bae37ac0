//! Page-script payloads (spec §4.2): JS injected into every document before
//! any other script runs, instrumenting history, network, DOM mutations,
//! title changes, clickable-element classification, click windows, and
//! taint reporting under one `window.__analysis` namespace.
//!
//! Each bundle guards itself with the sentinel so re-injection on
//! cross-document navigation (spec §9 design note) is a no-op beyond
//! bumping the injection counter; counters and change logs accumulate
//! across reinjections.

/// Guard every bundle installs first: `window.__analysis` is created once,
/// reused on every reinjection.
const SENTINEL_GUARD: &str = r#"
if (!window.__analysis) {
  window.__analysis = {
    injections: 0,
    history: { push: 0, replace: 0, pop: 0, log: [] },
    network: { requests: [] },
    dom: { mutations: [], initialTagCount: 0, finalTagCount: 0 },
    title: { entries: [] },
    clickable: { realLinks: 0, fakePatterns: 0, routerLikePatterns: 0, framework: null },
    clickWindow: { current: null, closed: [] },
    taint: { findings: [] },
  };
}
window.__analysis.injections += 1;
"#;

/// History-API hook: wraps `pushState`/`replaceState`, listens for
/// `popstate`.
pub const HISTORY_HOOK: &str = r#"
(function() {
  if (window.__analysisHistoryHooked) return;
  window.__analysisHistoryHooked = true;

  const original = { push: history.pushState, replace: history.replaceState };
  const record = (kind, newUrl, fromUrl) => {
    const a = window.__analysis.history;
    if (kind === 'push') a.push += 1;
    else if (kind === 'replace') a.replace += 1;
    else a.pop += 1;
    a.log.push({ kind, newUrl, fromUrl, t: Date.now() });
  };

  history.pushState = function(state, title, url) {
    const from = location.href;
    const result = original.push.apply(this, arguments);
    record('push', url ? String(url) : location.href, from);
    return result;
  };
  history.replaceState = function(state, title, url) {
    const from = location.href;
    const result = original.replace.apply(this, arguments);
    record('replace', url ? String(url) : location.href, from);
    return result;
  };
  window.addEventListener('popstate', () => record('pop', location.href, document.referrer));
})();
"#;

/// Network hook: wraps `fetch` and `XMLHttpRequest` to classify and record
/// requests as baseline or post-click based on the current click window.
pub const NETWORK_HOOK: &str = r#"
(function() {
  if (window.__analysisNetworkHooked) return;
  window.__analysisNetworkHooked = true;

  const record = (url, method, isJson) => {
    window.__analysis.network.requests.push({
      url, method, isJson, t: Date.now(),
      windowLabel: window.__analysis.clickWindow.current ? window.__analysis.clickWindow.current.label : null,
    });
  };

  const originalFetch = window.fetch;
  if (originalFetch) {
    window.fetch = function(input, init) {
      const url = typeof input === 'string' ? input : (input && input.url) || '';
      const method = (init && init.method) || 'GET';
      return originalFetch.apply(this, arguments).then((response) => {
        const contentType = response.headers.get('content-type') || '';
        record(url, method, contentType.includes('json'));
        return response;
      });
    };
  }

  const OriginalXhr = window.XMLHttpRequest;
  if (OriginalXhr) {
    window.XMLHttpRequest = function() {
      const xhr = new OriginalXhr();
      let url = '', method = 'GET';
      const originalOpen = xhr.open;
      xhr.open = function(m, u) {
        method = m; url = u;
        return originalOpen.apply(xhr, arguments);
      };
      xhr.addEventListener('load', () => {
        const contentType = xhr.getResponseHeader('content-type') || '';
        record(url, method, contentType.includes('json'));
      });
      return xhr;
    };
  }
})();
"#;

/// DOM-mutation hook: a `MutationObserver` on `document.documentElement`
/// recording added/removed node counts, attributed to baseline or the
/// current click window.
pub const DOM_HOOK: &str = r#"
(function() {
  if (window.__analysisDomHooked) return;
  window.__analysisDomHooked = true;

  window.__analysis.dom.initialTagCount = document.getElementsByTagName('*').length;

  const observer = new MutationObserver((mutations) => {
    let added = 0, removed = 0;
    for (const m of mutations) {
      added += m.addedNodes.length;
      removed += m.removedNodes.length;
    }
    if (added || removed) {
      window.__analysis.dom.mutations.push({
        added, removed, t: Date.now(),
        windowLabel: window.__analysis.clickWindow.current ? window.__analysis.clickWindow.current.label : null,
      });
    }
    window.__analysis.dom.finalTagCount = document.getElementsByTagName('*').length;
  });
  observer.observe(document.documentElement, { childList: true, subtree: true });
})();
"#;

/// Title-change hook: `MutationObserver` on `document.title`'s text node,
/// de-duplicating consecutive identical titles.
pub const TITLE_HOOK: &str = r#"
(function() {
  if (window.__analysisTitleHooked) return;
  window.__analysisTitleHooked = true;

  const record = () => {
    const entries = window.__analysis.title.entries;
    const last = entries[entries.length - 1];
    if (!last || last.title !== document.title) {
      entries.push({ title: document.title, url: location.href, t: Date.now() });
    }
  };
  record();

  const titleEl = document.querySelector('title');
  if (titleEl) {
    new MutationObserver(record).observe(titleEl, { childList: true, characterData: true, subtree: true });
  }
})();
"#;

/// Clickable-pattern hook: a one-shot classification of anchors and
/// fake-clickable elements, run at discovery time rather than continuously.
pub const CLICKABLE_HOOK: &str = r#"
(function() {
  if (window.__analysisClickableHooked) return;
  window.__analysisClickableHooked = true;

  const classify = () => {
    const c = window.__analysis.clickable;
    c.realLinks = 0; c.fakePatterns = 0; c.routerLikePatterns = 0;

    document.querySelectorAll('a[href]').forEach((a) => {
      const href = a.getAttribute('href') || '';
      if (href.startsWith('#') || href === 'javascript:void(0)' || href === '') {
        c.routerLikePatterns += 1;
      } else if (!href.startsWith('http') || href.startsWith(location.origin)) {
        c.realLinks += 1;
      }
    });
    document.querySelectorAll('[onclick], [data-href], .clickable, [role=button]:not(button)').forEach(() => {
      c.fakePatterns += 1;
    });

    if (window.React || document.querySelector('[data-reactroot]')) c.framework = 'react';
    else if (window.Vue || document.querySelector('[data-v-app]')) c.framework = 'vue';
    else if (window.ng || document.querySelector('[ng-version]')) c.framework = 'angular';
  };
  window.__analysisClassifyClickable = classify;
  classify();
})();
"#;

/// Click-window API exposed to the host: `startClickWindow`/`endClickWindow`
/// mirrored host-side by [`crate::click_window::ClickWindowTracker`].
/// Opening a window implicitly closes the previous one (spec §8 invariant 2
/// / idempotence test: a second `startClickWindow` closes and records the
/// first window with duration >= 0).
pub const CLICK_WINDOW_API: &str = r#"
(function() {
  window.startClickWindow = function(label) {
    window.endClickWindow();
    window.__analysis.clickWindow.current = { label, start: Date.now() };
  };
  window.endClickWindow = function() {
    const current = window.__analysis.clickWindow.current;
    if (!current) return;
    const end = Math.max(Date.now(), current.start);
    window.__analysis.clickWindow.closed.push({ label: current.label, start: current.start, end });
    window.__analysis.clickWindow.current = null;
  };
})();
"#;

/// Taint reporter: prefers a native automation hook if present, otherwise
/// patches `innerHTML`, `eval`, and `document.write` as a pseudo-hook
/// fallback (spec §9 open question — this set is not expanded beyond the
/// three the original implementation covers, to keep the dedup contract
/// simple).
pub const TAINT_REPORTER: &str = r#"
(function() {
  if (window.__analysisTaintHooked) return;
  window.__analysisTaintHooked = true;

  const report = (sink, sources, value) => {
    window.__analysis.taint.findings.push({ sink, sources, value: String(value).slice(0, 2000), url: location.href, t: Date.now() });
    if (window.__analysisReportTaint) {
      try { window.__analysisReportTaint(JSON.stringify({ sink, sources, value: String(value).slice(0, 2000), url: location.href })); }
      catch (e) { /* binding unavailable, buffered findings still readable via polling */ }
    }
  };

  if (!window.__analysisNativeTaint) {
    const descriptor = Object.getOwnPropertyDescriptor(Element.prototype, 'innerHTML');
    if (descriptor && descriptor.set) {
      Object.defineProperty(Element.prototype, 'innerHTML', {
        set(value) {
          report('innerHTML', ['unknown'], value);
          return descriptor.set.call(this, value);
        },
        get: descriptor.get,
        configurable: true,
      });
    }

    const originalEval = window.eval;
    window.eval = function(code) {
      report('eval', ['unknown'], code);
      return originalEval.call(this, code);
    };

    const originalWrite = document.write;
    document.write = function(markup) {
      report('document.write', ['unknown'], markup);
      return originalWrite.call(this, markup);
    };
  }
})();
"#;

/// Concatenates every hook bundle behind the sentinel guard, in
/// registration order: history, network, dom, title, clickable, click
/// window, taint reporter. Init-script registration happens-before the
/// first navigation (spec §8 invariant 1).
pub fn build_bundle() -> String {
    [
        SENTINEL_GUARD,
        HISTORY_HOOK,
        NETWORK_HOOK,
        DOM_HOOK,
        TITLE_HOOK,
        CLICKABLE_HOOK,
        CLICK_WINDOW_API,
        TAINT_REPORTER,
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_bundles() -> Vec<(&'static str, &'static str)> {
        vec![
            ("history", HISTORY_HOOK),
            ("network", NETWORK_HOOK),
            ("dom", DOM_HOOK),
            ("title", TITLE_HOOK),
            ("clickable", CLICKABLE_HOOK),
            ("click_window", CLICK_WINDOW_API),
            ("taint", TAINT_REPORTER),
        ]
    }

    #[test]
    fn sentinel_guard_creates_namespace_once() {
        assert!(SENTINEL_GUARD.contains("if (!window.__analysis)"));
        assert!(SENTINEL_GUARD.contains("window.__analysis.injections += 1"));
    }

    #[test]
    fn hooks_do_not_redeclare_namespace_unconditionally() {
        for (name, bundle) in all_bundles() {
            assert!(
                !bundle.contains("window.__analysis = {"),
                "{name} hook redeclares the __analysis namespace unconditionally"
            );
        }
    }

    #[test]
    fn hooks_guard_against_double_installation() {
        for (name, bundle) in all_bundles() {
            assert!(
                bundle.contains("Hooked = true") || bundle.contains("window.start"),
                "{name} hook has no idempotent installation guard"
            );
        }
    }

    #[test]
    fn full_bundle_includes_every_hook_in_order() {
        let bundle = build_bundle();
        let history_pos = bundle.find("__analysisHistoryHooked").unwrap();
        let network_pos = bundle.find("__analysisNetworkHooked").unwrap();
        let dom_pos = bundle.find("__analysisDomHooked").unwrap();
        let taint_pos = bundle.find("__analysisTaintHooked").unwrap();
        assert!(history_pos < network_pos);
        assert!(network_pos < dom_pos);
        assert!(dom_pos < taint_pos);
    }

    #[test]
    fn taint_reporter_only_hooks_three_pseudo_sinks() {
        assert!(TAINT_REPORTER.contains("innerHTML"));
        assert!(TAINT_REPORTER.contains("window.eval"));
        assert!(TAINT_REPORTER.contains("document.write"));
    }
}
