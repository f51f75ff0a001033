// crates/server/src/messages.rs
//! User-facing localized messages (Arabic UI).
//!
//! These are the only strings clients ever see in error bodies and progress
//! labels. Raw upstream diagnostics go to tracing, never into a response.

pub const URL_REQUIRED: &str = "الرابط مطلوب";
pub const INVALID_URL: &str = "رابط غير صالح";
pub const URL_AND_FORMAT_REQUIRED: &str = "الرابط والجودة مطلوبان";
pub const INFO_FAILED: &str = "فشل جلب معلومات الفيديو. تحقق من الرابط وحاول مرة أخرى.";
pub const START_FAILED: &str = "فشل بدء التحميل";
pub const DOWNLOAD_FAILED: &str = "فشل التحميل";
pub const CONVERTING: &str = "جاري التحويل...";
pub const FILE_NOT_FOUND: &str = "الملف غير موجود";
