mod sink;

pub use sink::TelegramSink;
