use ryu::Buffer;
use std::cell::RefCell;
use std::fmt;

/// Shortest round-trip rendering of a score, without a trailing `.0`.
#[inline]
pub fn fmt_score(buf: &mut Buffer, score: f64) -> &str {
    if score.is_infinite() {
        return if score > 0.0 { "inf" } else { "-inf" };
    }
    debug_assert!(!score.is_nan(), "NaN scores are not supported");
    let formatted = buf.format_finite(score);
    formatted.strip_suffix(".0").unwrap_or(formatted)
}

thread_local! {
    static FMT_BUF: RefCell<Buffer> = RefCell::new(Buffer::new());
}

#[inline]
pub fn with_fmt_buf<F, R>(f: F) -> R
where
    F: FnOnce(&mut Buffer) -> R,
{
    FMT_BUF.with(|b| f(&mut b.borrow_mut()))
}

pub(crate) fn write_score(f: &mut fmt::Formatter<'_>, score: f64) -> fmt::Result {
    with_fmt_buf(|buf| f.write_str(fmt_score(buf, score)))
}
