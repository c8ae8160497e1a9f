//! Typed, settable values bound to flags and positional arguments.
//!
//! A value is shared (`ValueRef`) between the declaration and the runtime
//! flag, so every `set` must go through interior mutability. Callers keep a
//! [`Slot`] handle to read the bound result after a run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Duration as StdDuration;

use itertools::Itertools;
use regex::Regex;

use crate::domain::error::{ParseError, ValidationError, ValueError};

/// Shared handle to a dynamically typed value.
pub type ValueRef = Rc<dyn Value>;

/// Uniform contract for flag and argument values.
pub trait Value: fmt::Debug {
    /// Parse `raw` and store the result.
    fn set(&self, raw: &str) -> Result<(), ValueError>;

    /// Current value rendered for display.
    fn render(&self) -> String;

    /// Stable type tag, e.g. `"int64"` or `"stringArray"`.
    fn type_name(&self) -> &'static str;

    /// Operand implied when the flag appears bare (`--verbose`).
    fn no_opt_default(&self) -> Option<&'static str> {
        None
    }

    /// Allowed inputs, for values restricted to a choice set.
    fn choices(&self) -> Option<Vec<String>> {
        None
    }

    /// Apply a compiled-in default. List values override this so the first
    /// explicit `set` replaces the default instead of appending to it.
    fn set_default(&self, raw: &str) -> Result<(), ValueError> {
        self.set(raw)
    }

    /// Restore the state the value was created with, dropping anything a
    /// previous run stored.
    fn reset(&self) {}
}

/// Caller-visible storage shared with the value that writes into it.
///
/// The slot remembers the value it was created with; [`Slot::reset`]
/// restores it.
#[derive(Debug)]
pub struct Slot<T> {
    cell: Rc<RefCell<T>>,
    initial: Rc<T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            initial: Rc::clone(&self.initial),
        }
    }
}

impl<T: Clone + Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Slot<T> {
    pub fn replace(&self, value: T) -> T {
        self.cell.replace(value)
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.borrow_mut())
    }
}

impl<T: Clone> Slot<T> {
    pub fn new(value: T) -> Self {
        Self {
            initial: Rc::new(value.clone()),
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    /// Put the initial value back.
    pub fn reset(&self) {
        self.cell.replace(T::clone(&self.initial));
    }
}

macro_rules! slot_accessors {
    ($ty:ident, $inner:ty) => {
        impl $ty {
            /// Value writing into a fresh slot.
            pub fn new() -> Self {
                Self::bound(&Slot::default())
            }

            /// Current value.
            pub fn value(&self) -> $inner {
                self.slot.get()
            }

            /// Handle to the underlying storage.
            pub fn slot(&self) -> Slot<$inner> {
                self.slot.clone()
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Plain string.
#[derive(Debug, Clone)]
pub struct Str {
    slot: Slot<String>,
}

impl Str {
    pub fn bound(slot: &Slot<String>) -> Self {
        Self { slot: slot.clone() }
    }
}

slot_accessors!(Str, String);

impl Value for Str {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        self.slot.replace(raw.to_string());
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get()
    }

    fn type_name(&self) -> &'static str {
        "string"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// Signed 64-bit integer.
#[derive(Debug, Clone)]
pub struct Int64 {
    slot: Slot<i64>,
}

impl Int64 {
    pub fn bound(slot: &Slot<i64>) -> Self {
        Self { slot: slot.clone() }
    }
}

slot_accessors!(Int64, i64);

impl Value for Int64 {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let parsed = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| ParseError::new("int64", raw, e.to_string()))?;
        self.slot.replace(parsed);
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get().to_string()
    }

    fn type_name(&self) -> &'static str {
        "int64"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// 64-bit float.
#[derive(Debug, Clone)]
pub struct Float64 {
    slot: Slot<f64>,
}

impl Float64 {
    pub fn bound(slot: &Slot<f64>) -> Self {
        Self { slot: slot.clone() }
    }
}

slot_accessors!(Float64, f64);

impl Value for Float64 {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let parsed = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| ParseError::new("float64", raw, e.to_string()))?;
        self.slot.replace(parsed);
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get().to_string()
    }

    fn type_name(&self) -> &'static str {
        "float64"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// Boolean; a bare flag means `true`.
#[derive(Debug, Clone)]
pub struct Bool {
    slot: Slot<bool>,
}

impl Bool {
    pub fn bound(slot: &Slot<bool>) -> Self {
        Self { slot: slot.clone() }
    }
}

slot_accessors!(Bool, bool);

/// Accepted spellings, mirroring the usual `ParseBool` set.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        _ => None,
    }
}

impl Value for Bool {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let parsed = parse_bool(raw)
            .ok_or_else(|| ParseError::new("bool", raw, "expected true or false"))?;
        self.slot.replace(parsed);
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get().to_string()
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn reset(&self) {
        self.slot.reset();
    }

    fn no_opt_default(&self) -> Option<&'static str> {
        Some("true")
    }
}

/// Non-negative duration written as `1h30m`, `250ms`, `1.5s`.
#[derive(Debug, Clone)]
pub struct Duration {
    slot: Slot<StdDuration>,
}

impl Duration {
    pub fn bound(slot: &Slot<StdDuration>) -> Self {
        Self { slot: slot.clone() }
    }
}

slot_accessors!(Duration, StdDuration);

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}

pub(crate) fn parse_duration(raw: &str) -> Result<StdDuration, String> {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    } else if s.starts_with('-') {
        return Err("negative durations are not supported".into());
    }
    if s == "0" {
        return Ok(StdDuration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let int_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (int_part, rest) = s.split_at(int_end);
        let (frac_part, rest) = match rest.strip_prefix('.') {
            Some(after) => {
                let end = after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len());
                after.split_at(end)
            }
            None => ("", rest),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {raw:?}"));
        }
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let (unit, rest) = rest.split_at(unit_end);
        if unit.is_empty() {
            return Err(format!("missing unit in duration {raw:?}"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| format!("unknown unit {unit:?} in duration {raw:?}"))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("duration {raw:?} overflows"))?
        };
        let overflow = || format!("duration {raw:?} overflows");
        total = whole
            .checked_mul(scale)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(overflow)?;
        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision cannot contribute.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits
                .parse()
                .map_err(|_| format!("invalid duration {raw:?}"))?;
            total = total
                .checked_add(frac * scale / 10u128.pow(digits.len() as u32))
                .ok_or_else(overflow)?;
        }
        s = rest;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| format!("duration {raw:?} overflows"))?;
    Ok(StdDuration::new(secs, (total % NANOS_PER_SEC) as u32))
}

fn fmt_fraction(value: u128, precision: u32) -> String {
    let div = 10u128.pow(precision);
    let whole = value / div;
    let frac = value % div;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = precision as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

pub(crate) fn format_duration(d: StdDuration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fmt_fraction(nanos, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fmt_fraction(nanos, 6));
    }
    let hours = nanos / (3_600 * NANOS_PER_SEC);
    let minutes = (nanos / (60 * NANOS_PER_SEC)) % 60;
    let seconds = fmt_fraction(nanos % (60 * NANOS_PER_SEC), 9);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, m) => format!("{m}m{seconds}s"),
        (h, m) => format!("{h}h{m}m{seconds}s"),
    }
}

impl Value for Duration {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let parsed = parse_duration(raw).map_err(|reason| ParseError::new("duration", raw, reason))?;
        self.slot.replace(parsed);
        Ok(())
    }

    fn render(&self) -> String {
        format_duration(self.slot.get())
    }

    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// Comma-separated list; repeated `set` calls append.
#[derive(Debug, Clone)]
pub struct StringArray {
    slot: Slot<Vec<String>>,
    replaceable: Rc<Cell<bool>>,
}

impl StringArray {
    pub fn bound(slot: &Slot<Vec<String>>) -> Self {
        Self {
            slot: slot.clone(),
            replaceable: Rc::new(Cell::new(false)),
        }
    }
}

slot_accessors!(StringArray, Vec<String>);

fn split_list(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

impl Value for StringArray {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let items = split_list(raw);
        if self.replaceable.replace(false) {
            self.slot.replace(items);
        } else {
            self.slot.with_mut(|v| v.extend(items));
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!("[{}]", self.slot.get().join(","))
    }

    fn type_name(&self) -> &'static str {
        "stringArray"
    }

    fn reset(&self) {
        self.slot.reset();
        self.replaceable.set(false);
    }

    fn set_default(&self, raw: &str) -> Result<(), ValueError> {
        self.slot.replace(split_list(raw));
        self.replaceable.set(true);
        Ok(())
    }
}

fn find_choice<'a>(choices: &'a [String], raw: &str) -> Option<&'a String> {
    choices.iter().find(|c| c.eq_ignore_ascii_case(raw))
}

/// One of a fixed set of strings, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct Enum {
    slot: Slot<String>,
    choices: Vec<String>,
}

impl Enum {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::bound(&Slot::default(), choices)
    }

    pub fn bound<I, S>(slot: &Slot<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slot: slot.clone(),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn value(&self) -> String {
        self.slot.get()
    }

    pub fn slot(&self) -> Slot<String> {
        self.slot.clone()
    }
}

impl Value for Enum {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        if find_choice(&self.choices, raw).is_none() {
            return Err(ParseError::new(
                "enum",
                raw,
                format!("should be one of {}", self.choices.iter().join("|")),
            )
            .into());
        }
        self.slot.replace(raw.to_string());
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get()
    }

    fn type_name(&self) -> &'static str {
        "enum"
    }

    fn reset(&self) {
        self.slot.reset();
    }

    fn choices(&self) -> Option<Vec<String>> {
        Some(self.choices.clone())
    }
}

/// Comma-separated list where every item must be a known choice.
#[derive(Debug, Clone)]
pub struct EnumArray {
    slot: Slot<Vec<String>>,
    choices: Vec<String>,
    replaceable: Rc<Cell<bool>>,
}

impl EnumArray {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::bound(&Slot::default(), choices)
    }

    pub fn bound<I, S>(slot: &Slot<Vec<String>>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slot: slot.clone(),
            choices: choices.into_iter().map(Into::into).collect(),
            replaceable: Rc::new(Cell::new(false)),
        }
    }

    pub fn value(&self) -> Vec<String> {
        self.slot.get()
    }

    pub fn slot(&self) -> Slot<Vec<String>> {
        self.slot.clone()
    }

    fn checked(&self, raw: &str) -> Result<Vec<String>, ValueError> {
        let items = split_list(raw);
        if let Some(bad) = items.iter().find(|i| find_choice(&self.choices, i).is_none()) {
            return Err(ParseError::new(
                "enumArray",
                bad,
                format!("should be one of {}", self.choices.iter().join("|")),
            )
            .into());
        }
        Ok(items)
    }
}

impl Value for EnumArray {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let items = self.checked(raw)?;
        if self.replaceable.replace(false) {
            self.slot.replace(items);
        } else {
            self.slot.with_mut(|v| v.extend(items));
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!("[{}]", self.slot.get().join(","))
    }

    fn type_name(&self) -> &'static str {
        "enumArray"
    }

    fn reset(&self) {
        self.slot.reset();
        self.replaceable.set(false);
    }

    fn choices(&self) -> Option<Vec<String>> {
        Some(self.choices.clone())
    }

    fn set_default(&self, raw: &str) -> Result<(), ValueError> {
        let items = self.checked(raw)?;
        self.slot.replace(items);
        self.replaceable.set(true);
        Ok(())
    }
}

/// URL with a scheme, kept verbatim.
#[derive(Debug, Clone)]
pub struct Url {
    slot: Slot<String>,
}

impl Url {
    pub fn bound(slot: &Slot<String>) -> Self {
        Self { slot: slot.clone() }
    }

    /// Scheme of the current value, if any.
    pub fn scheme(&self) -> Option<String> {
        self.slot
            .with(|s| s.split_once(':').map(|(scheme, _)| scheme.to_ascii_lowercase()))
    }
}

slot_accessors!(Url, String);

impl Value for Url {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        static RE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = RE
            .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").ok())
            .as_ref()
            .ok_or_else(|| ParseError::new("url", raw, "url pattern unavailable"))?;
        if !re.is_match(raw) {
            return Err(ParseError::new("url", raw, "expected scheme:body without spaces").into());
        }
        self.slot.replace(raw.to_string());
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.get()
    }

    fn type_name(&self) -> &'static str {
        "url"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// `host:port` pair; IPv6 hosts are bracketed (`[::1]:8080`).
#[derive(Debug, Clone)]
pub struct HostPort {
    slot: Slot<(String, String)>,
}

impl HostPort {
    pub fn bound(slot: &Slot<(String, String)>) -> Self {
        Self { slot: slot.clone() }
    }

    pub fn host(&self) -> String {
        self.slot.with(|(host, _)| host.clone())
    }

    pub fn port(&self) -> String {
        self.slot.with(|(_, port)| port.clone())
    }
}

slot_accessors!(HostPort, (String, String));

fn split_host_port(raw: &str) -> Result<(String, String), String> {
    if raw.is_empty() {
        return Err("missing host and port".into());
    }
    let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "missing ']' in address".to_string())?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        (host, port)
    } else {
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| "missing port in address".to_string())?;
        if host.contains(':') {
            return Err("too many colons in address".into());
        }
        (host, port)
    };
    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid port {port:?}"));
    }
    Ok((host.to_string(), port.to_string()))
}

impl Value for HostPort {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let pair = split_host_port(raw).map_err(|reason| ParseError::new("host:port", raw, reason))?;
        self.slot.replace(pair);
        Ok(())
    }

    fn render(&self) -> String {
        self.slot.with(|(host, port)| {
            if host.contains(':') {
                format!("[{host}]:{port}")
            } else if host.is_empty() && port.is_empty() {
                String::new()
            } else {
                format!("{host}:{port}")
            }
        })
    }

    fn type_name(&self) -> &'static str {
        "host:port"
    }

    fn reset(&self) {
        self.slot.reset();
    }
}

/// Sink accepting and dropping any input; used when a declaration has no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Value for Discard {
    fn set(&self, _raw: &str) -> Result<(), ValueError> {
        Ok(())
    }

    fn render(&self) -> String {
        String::new()
    }

    fn type_name(&self) -> &'static str {
        "discard"
    }

    fn no_opt_default(&self) -> Option<&'static str> {
        Some("true")
    }
}

/// Value decorated with a post-`set` predicate.
pub struct Validated<V, F> {
    inner: V,
    check: F,
}

impl<V: fmt::Debug, F> fmt::Debug for Validated<V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validated").field("inner", &self.inner).finish()
    }
}

/// Wrap `inner` so every successful `set` is followed by `check`.
pub fn validate<V, F>(inner: V, check: F) -> Validated<V, F>
where
    V: Value,
    F: Fn(&V) -> Result<(), ValidationError>,
{
    Validated { inner, check }
}

impl<V, F> Validated<V, F> {
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

impl<V, F> Value for Validated<V, F>
where
    V: Value,
    F: Fn(&V) -> Result<(), ValidationError>,
{
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        self.inner.set(raw)?;
        (self.check)(&self.inner)?;
        Ok(())
    }

    fn render(&self) -> String {
        self.inner.render()
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn no_opt_default(&self) -> Option<&'static str> {
        self.inner.no_opt_default()
    }

    fn choices(&self) -> Option<Vec<String>> {
        self.inner.choices()
    }

    fn set_default(&self, raw: &str) -> Result<(), ValueError> {
        self.inner.set_default(raw)?;
        (self.check)(&self.inner)?;
        Ok(())
    }

    fn reset(&self) {
        self.inner.reset();
    }
}
