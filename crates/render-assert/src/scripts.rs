//! In-page measurement scripts.
//!
//! Each script is a self-contained JS function expression taking one JSON
//! argument. They only read and return plain data; all decisions happen on
//! the Rust side. Scripts that must observe a repaint await animation frames
//! themselves so the round-trip returns post-paint state.

/// A named page-context function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    /// Short name used in diagnostics and by `MockPage`
    pub name: &'static str,
    /// JS function expression
    pub source: &'static str,
}

impl Script {
    /// Expression calling this script with a JSON-encoded argument
    #[must_use]
    pub fn invocation(&self, arg_json: &str) -> String {
        format!("({})({})", self.source, arg_json)
    }
}

/// `{selector}` -> number of matches
pub const COUNT: Script = Script {
    name: "count",
    source: r#"(a) => document.querySelectorAll(a.selector).length"#,
};

/// `{selector}` -> number of matches with a non-empty, visible box
pub const VISIBLE_COUNT: Script = Script {
    name: "visible_count",
    source: r#"(a) => Array.from(document.querySelectorAll(a.selector)).filter((el) => {
        const r = el.getBoundingClientRect();
        const cs = getComputedStyle(el);
        return r.width > 0 && r.height > 0 && cs.visibility !== 'hidden' && cs.display !== 'none';
    }).length"#,
};

/// `{selector, nth}` -> rect or null
pub const RECT_AT: Script = Script {
    name: "rect_at",
    source: r#"(a) => {
        const el = document.querySelectorAll(a.selector)[a.nth];
        if (!el) return null;
        const r = el.getBoundingClientRect();
        return { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height };
    }"#,
};

/// `{selector}` -> rects of every match, in document order
pub const RECTS: Script = Script {
    name: "rects",
    source: r#"(a) => Array.from(document.querySelectorAll(a.selector)).map((el) => {
        const r = el.getBoundingClientRect();
        return { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height };
    })"#,
};

/// `{selector, props}` -> `{prop: value}` of the first match, or null
pub const READ_STYLE: Script = Script {
    name: "read_style",
    source: r#"(a) => {
        const el = document.querySelector(a.selector);
        if (!el) return null;
        const cs = getComputedStyle(el);
        const out = {};
        for (const p of a.props) out[p] = cs.getPropertyValue(p).trim();
        return out;
    }"#,
};

/// `{selector, state}` -> whether the first match is in `state`
pub const SELECTOR_STATE: Script = Script {
    name: "selector_state",
    source: r#"(a) => {
        const el = document.querySelector(a.selector);
        const visible = !!el && (() => {
            const r = el.getBoundingClientRect();
            const cs = getComputedStyle(el);
            return r.width > 0 && r.height > 0 && cs.visibility !== 'hidden';
        })();
        switch (a.state) {
            case 'attached': return !!el;
            case 'detached': return !el;
            case 'visible': return visible;
            default: return !visible;
        }
    }"#,
};

/// `{selector, min}` -> at least `min` matches
pub const MIN_COUNT: Script = Script {
    name: "min_count",
    source: r#"(a) => document.querySelectorAll(a.selector).length >= a.min"#,
};

/// `{root, max, themeAttr, themeVar}` -> page background context plus every
/// visible element under `root` that owns a non-blank text node, with its
/// text color and background ancestor chain.
pub const TEXT_SAMPLES: Script = Script {
    name: "text_samples",
    source: r#"(a) => {
        const root = document.querySelector(a.root);
        if (!root) return null;
        const chainOf = (el) => {
            const chain = [];
            for (let n = el; n; n = n.parentElement) {
                const cs = getComputedStyle(n);
                chain.push({ backgroundColor: cs.backgroundColor, backgroundImage: cs.backgroundImage });
            }
            return chain;
        };
        const labelOf = (el) => {
            const id = el.id ? '#' + el.id : '';
            const cls = typeof el.className === 'string' && el.className.trim()
                ? '.' + el.className.trim().split(/\s+/).join('.') : '';
            const text = (el.textContent || '').trim().replace(/\s+/g, ' ').slice(0, 24);
            return el.tagName.toLowerCase() + id + cls + ' "' + text + '"';
        };
        const ownsText = (el) => Array.from(el.childNodes)
            .some((c) => c.nodeType === Node.TEXT_NODE && c.textContent.trim().length > 0);
        const samples = [];
        const all = [root, ...root.querySelectorAll('*')];
        for (const el of all) {
            if (samples.length >= a.max) break;
            if (!ownsText(el)) continue;
            const r = el.getBoundingClientRect();
            const cs = getComputedStyle(el);
            if (r.width === 0 || r.height === 0 || cs.visibility === 'hidden' || Number(cs.opacity) === 0) continue;
            samples.push({ label: labelOf(el), color: cs.color, chain: chainOf(el) });
        }
        const docEl = document.documentElement;
        return {
            context: {
                body: getComputedStyle(document.body).backgroundColor,
                themeVar: getComputedStyle(docEl).getPropertyValue(a.themeVar).trim(),
                theme: docEl.getAttribute(a.themeAttr),
            },
            samples,
        };
    }"#,
};

/// `{root, accent, control, themeAttr, themeVar}` -> accent glyph colors and
/// control border colors, each with the background chain behind it. Border
/// chains start at the control's parent: a border sits on the surface
/// around the control, not on its own fill.
pub const CONTROL_SAMPLES: Script = Script {
    name: "control_samples",
    source: r#"(a) => {
        const root = document.querySelector(a.root);
        if (!root) return null;
        const chainOf = (el) => {
            const chain = [];
            for (let n = el; n; n = n.parentElement) {
                const cs = getComputedStyle(n);
                chain.push({ backgroundColor: cs.backgroundColor, backgroundImage: cs.backgroundImage });
            }
            return chain;
        };
        const labelOf = (el) => el.tagName.toLowerCase() + (el.id ? '#' + el.id : '')
            + (typeof el.className === 'string' && el.className.trim() ? '.' + el.className.trim().split(/\s+/).join('.') : '');
        const visible = (el) => {
            const r = el.getBoundingClientRect();
            const cs = getComputedStyle(el);
            return r.width > 0 && r.height > 0 && cs.visibility !== 'hidden';
        };
        const accents = Array.from(root.querySelectorAll(a.accent)).filter(visible).map((el) => {
            const cs = getComputedStyle(el);
            const fill = cs.fill && cs.fill !== 'none' && el instanceof SVGElement ? cs.fill : cs.color;
            return { label: labelOf(el), color: fill, chain: chainOf(el) };
        });
        const borders = Array.from(root.querySelectorAll(a.control)).filter(visible).filter((el) => {
            const cs = getComputedStyle(el);
            return cs.borderTopStyle !== 'none' && parseFloat(cs.borderTopWidth) > 0;
        }).map((el) => ({
            label: labelOf(el),
            color: getComputedStyle(el).borderTopColor,
            chain: el.parentElement ? chainOf(el.parentElement) : [],
        }));
        const docEl = document.documentElement;
        return {
            context: {
                body: getComputedStyle(document.body).backgroundColor,
                themeVar: getComputedStyle(docEl).getPropertyValue(a.themeVar).trim(),
                theme: docEl.getAttribute(a.themeAttr),
            },
            accents,
            borders,
        };
    }"#,
};

/// `{selector, attr}` -> attribute value of the first match, or null
pub const GET_ATTRIBUTE: Script = Script {
    name: "get_attribute",
    source: r#"(a) => {
        const el = a.selector === ':root' ? document.documentElement : document.querySelector(a.selector);
        return el ? el.getAttribute(a.attr) : null;
    }"#,
};

/// `{attr, value}` -> previous attribute value; `value: null` removes it.
/// Resolves after two animation frames so restyled colors are computed.
pub const SET_THEME: Script = Script {
    name: "set_theme",
    source: r#"async (a) => {
        const el = document.documentElement;
        const previous = el.getAttribute(a.attr);
        if (a.value === null) el.removeAttribute(a.attr); else el.setAttribute(a.attr, a.value);
        await new Promise((r) => requestAnimationFrame(() => requestAnimationFrame(r)));
        return previous;
    }"#,
};

/// `{menu, scroller, item, trigger, footer, indicatorAttr}` -> menu geometry
/// and scroll state, or null when the menu is absent.
pub const MENU_METRICS: Script = Script {
    name: "menu_metrics",
    source: r#"(a) => {
        const menu = document.querySelector(a.menu);
        if (!menu) return null;
        const rect = (el) => {
            const r = el.getBoundingClientRect();
            return { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height };
        };
        const scroller = menu.querySelector(a.scroller) || (menu.matches(a.scroller) ? menu : null);
        const trigger = a.trigger ? document.querySelector(a.trigger) : null;
        const footer = a.footer ? document.querySelector(a.footer) : null;
        return {
            viewport: { width: window.innerWidth, height: window.innerHeight },
            menu: rect(menu),
            outerScrollTop: menu.scrollTop,
            indicator: menu.getAttribute(a.indicatorAttr),
            scroller: scroller ? {
                rect: rect(scroller),
                scrollTop: scroller.scrollTop,
                scrollHeight: scroller.scrollHeight,
                clientHeight: scroller.clientHeight,
                clientTop: scroller.clientTop,
                scrollWidth: scroller.scrollWidth,
                clientWidth: scroller.clientWidth,
                overscrollBehaviorY: getComputedStyle(scroller).overscrollBehaviorY,
            } : null,
            items: Array.from(menu.querySelectorAll(a.item)).map(rect),
            trigger: trigger ? rect(trigger) : null,
            footer: footer ? rect(footer) : null,
        };
    }"#,
};

/// `{within?, scroller, to}` where `to` is `top`, `bottom` or a pixel offset.
/// The scroller is looked up inside `within` (the element itself may match)
/// or the whole document when `within` is unset, the same way
/// [`MENU_METRICS`] finds it. Sets `scrollTop`, dispatches `scroll`, waits
/// one paint, returns the previous offset (null if the scroller is absent).
pub const SCROLL_TO: Script = Script {
    name: "scroll_to",
    source: r#"async (a) => {
        const root = a.within ? document.querySelector(a.within) : document;
        if (!root) return null;
        const el = root === document
            ? document.querySelector(a.scroller)
            : root.querySelector(a.scroller) || (root.matches(a.scroller) ? root : null);
        if (!el) return null;
        const previous = el.scrollTop;
        el.scrollTop = a.to === 'top' ? 0 : a.to === 'bottom' ? el.scrollHeight : Number(a.to);
        el.dispatchEvent(new Event('scroll'));
        await new Promise((r) => requestAnimationFrame(() => requestAnimationFrame(r)));
        return previous;
    }"#,
};

/// `{scroller, within?}` -> overflow metrics of a plain scroll container,
/// looked up like [`SCROLL_TO`]
pub const SCROLL_METRICS: Script = Script {
    name: "scroll_metrics",
    source: r#"(a) => {
        const root = a.within ? document.querySelector(a.within) : document;
        if (!root) return null;
        const el = root === document
            ? document.querySelector(a.scroller)
            : root.querySelector(a.scroller) || (root.matches(a.scroller) ? root : null);
        if (!el) return null;
        const r = el.getBoundingClientRect();
        return {
            rect: { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height },
            scrollTop: el.scrollTop,
            scrollHeight: el.scrollHeight,
            clientHeight: el.clientHeight,
            clientTop: el.clientTop,
            scrollWidth: el.scrollWidth,
            clientWidth: el.clientWidth,
            overscrollBehaviorY: getComputedStyle(el).overscrollBehaviorY,
        };
    }"#,
};

/// `{selector, frames}` -> one sample per animation frame of the first
/// match's transform and transition declaration; null for frames where the
/// element is missing.
pub const FRAME_SAMPLES: Script = Script {
    name: "frame_samples",
    source: r#"async (a) => {
        const out = [];
        for (let i = 0; i < a.frames; i++) {
            await new Promise((r) => requestAnimationFrame(r));
            const el = document.querySelector(a.selector);
            if (!el) { out.push(null); continue; }
            const cs = getComputedStyle(el);
            out.push({
                transform: cs.transform,
                transitionProperty: cs.transitionProperty,
                transitionDuration: cs.transitionDuration,
            });
        }
        return out;
    }"#,
};

/// `{selector}` -> horizontal overflow of each match
pub const LABEL_OVERFLOW: Script = Script {
    name: "label_overflow",
    source: r#"(a) => Array.from(document.querySelectorAll(a.selector)).map((el) => ({
        label: el.tagName.toLowerCase() + ' "' + (el.textContent || '').trim().slice(0, 24) + '"',
        scrollWidth: el.scrollWidth,
        clientWidth: el.clientWidth,
        textOverflow: getComputedStyle(el).textOverflow,
    }))"#,
};

/// `{section, title, control}` -> `{sections, incomplete}` where each
/// section carries its own, its title's and its first control's rect.
pub const SECTION_BOXES: Script = Script {
    name: "section_boxes",
    source: r#"(a) => {
        const rect = (el) => {
            const r = el.getBoundingClientRect();
            return { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height };
        };
        const sections = [];
        let incomplete = 0;
        for (const s of document.querySelectorAll(a.section)) {
            const title = s.querySelector(a.title);
            const control = s.querySelector(a.control);
            if (!title || !control) { incomplete++; continue; }
            sections.push({ section: rect(s), title: rect(title), firstControl: rect(control) });
        }
        return { sections, incomplete };
    }"#,
};

/// `{row, button}` -> rects of `button` matches, grouped per `row`
pub const ROW_BUTTONS: Script = Script {
    name: "row_buttons",
    source: r#"(a) => Array.from(document.querySelectorAll(a.row)).map((row) =>
        Array.from(row.querySelectorAll(a.button)).map((el) => {
            const r = el.getBoundingClientRect();
            return { left: r.left, right: r.right, top: r.top, bottom: r.bottom, width: r.width, height: r.height };
        }))"#,
};

/// `{selector}` -> whether the first match reports itself switched on, or
/// null when absent. Reads `aria-pressed`, `aria-checked`, `data-active`,
/// the `checked` property of inputs and finally an `active` class.
pub const TOGGLE_STATE: Script = Script {
    name: "toggle_state",
    source: r#"(a) => {
        const el = document.querySelector(a.selector);
        if (!el) return null;
        const aria = el.getAttribute('aria-pressed') ?? el.getAttribute('aria-checked');
        if (aria !== null) return aria === 'true';
        if (el.dataset.active !== undefined) return el.dataset.active !== 'false';
        if (el instanceof HTMLInputElement) return el.checked;
        return el.classList.contains('active');
    }"#,
};

/// `{namespace, name, args}` -> `{ok}`; calls `window[namespace][name](...args)`
/// when it exists and awaits its result.
pub const HOOK_CALL: Script = Script {
    name: "hook_call",
    source: r#"async (a) => {
        const hooks = window[a.namespace];
        if (!hooks || typeof hooks[a.name] !== 'function') return { ok: false };
        await hooks[a.name](...a.args);
        return { ok: true };
    }"#,
};

/// `{namespace}` -> deep copy of the hook snapshot, or null
pub const HOOK_SNAPSHOT: Script = Script {
    name: "hook_snapshot",
    source: r#"(a) => {
        const hooks = window[a.namespace];
        if (!hooks) return null;
        const snap = typeof hooks.getSnapshot === 'function' ? hooks.getSnapshot() : hooks.snapshot;
        return snap ? JSON.parse(JSON.stringify(snap)) : null;
    }"#,
};

/// `{namespace, events}` -> `{ok, applied}`; replaces the fixture's event
/// list through `setEvents` when the page exposes it, otherwise by assigning
/// `events` on the live snapshot. `applied` reports whether a fresh snapshot
/// read lists the ids in the requested order.
pub const HOOK_SET_EVENTS: Script = Script {
    name: "hook_set_events",
    source: r#"async (a) => {
        const hooks = window[a.namespace];
        if (!hooks) return { ok: false };
        const read = () => typeof hooks.getSnapshot === 'function' ? hooks.getSnapshot() : hooks.snapshot;
        if (typeof hooks.setEvents === 'function') {
            await hooks.setEvents(a.events);
        } else {
            const snap = read();
            if (!snap) return { ok: false };
            snap.events = a.events;
        }
        const after = read();
        const ids = (after && Array.isArray(after.events) ? after.events : []).map((e) => String(e.id));
        const wanted = a.events.map((e) => String(e.id));
        return { ok: true, applied: JSON.stringify(ids) === JSON.stringify(wanted) };
    }"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[Script] = &[
        COUNT,
        VISIBLE_COUNT,
        RECT_AT,
        RECTS,
        READ_STYLE,
        SELECTOR_STATE,
        MIN_COUNT,
        TEXT_SAMPLES,
        CONTROL_SAMPLES,
        GET_ATTRIBUTE,
        SET_THEME,
        MENU_METRICS,
        SCROLL_TO,
        SCROLL_METRICS,
        FRAME_SAMPLES,
        LABEL_OVERFLOW,
        SECTION_BOXES,
        ROW_BUTTONS,
        TOGGLE_STATE,
        HOOK_CALL,
        HOOK_SNAPSHOT,
        HOOK_SET_EVENTS,
    ];

    #[test]
    fn test_script_names_unique() {
        let mut names: Vec<&str> = ALL.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_scripts_are_single_argument_functions() {
        for script in ALL {
            let src = script.source.trim_start();
            assert!(
                src.starts_with("(a) =>") || src.starts_with("async (a) =>"),
                "{} is not a one-argument arrow function",
                script.name
            );
        }
    }

    #[test]
    fn test_menu_scroll_and_metrics_share_scroller_lookup() {
        let scoped = "root.querySelector(a.scroller) || (root.matches(a.scroller) ? root : null)";
        assert!(SCROLL_TO.source.contains(scoped));
        assert!(SCROLL_METRICS.source.contains(scoped));
        assert!(MENU_METRICS
            .source
            .contains("menu.querySelector(a.scroller) || (menu.matches(a.scroller) ? menu : null)"));
    }

    #[test]
    fn test_invocation_wraps_source() {
        let call = COUNT.invocation(r#"{"selector":".x"}"#);
        assert!(call.starts_with("((a) => document"));
        assert!(call.ends_with(r#")({"selector":".x"})"#));
    }
}
