//! Shared UI icons with ASCII fallbacks.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Fork lifecycle
pub static FORK: Emoji<'_, '_> = Emoji("🍴 ", "[F]");
pub static SYNC: Emoji<'_, '_> = Emoji("🔄 ", "[S]");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "[D]");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "[L]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏳ ", "[T]");

// Accounts
pub static MAIL: Emoji<'_, '_> = Emoji("📨 ", "[>]");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[K]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "[#]");
