//! Ping plugin - response time of the gateway round trip

use std::time::Instant;

use super::reply_usage;
use crate::application::errors::BotError;
use crate::application::messaging::Filter;
use crate::domain::entities::Message;
use crate::plugins::{HandlerSpec, Plugin, PluginContext, PluginInfo};

const DEFAULT_SAMPLES: usize = 5;
const MAX_SAMPLES: usize = 10;

pub struct PingPlugin;

impl PingPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PingPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn info(&self) -> PluginInfo {
        PluginInfo::new("ping")
            .with_display_name("Ping")
            .with_description("Network latency and response time testing")
            .with_version("1.0.0")
            .with_commands(["ping", "pings"])
    }

    fn handlers(&self, ctx: &PluginContext) -> Vec<HandlerSpec> {
        let ping_ctx = ctx.clone();
        let pings_ctx = ctx.clone();
        vec![
            HandlerSpec::message(Filter::command(["ping"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = ping_ctx.clone();
                async move { ping(&ctx, message).await }
            }),
            HandlerSpec::message(Filter::command(["pings"], ctx.prefix()) & Filter::Me, move |message| {
                let ctx = pings_ctx.clone();
                async move { pings(&ctx, message).await }
            }),
        ]
    }
}

/// Quality label for a latency in milliseconds
pub fn quality(ping_ms: f64) -> &'static str {
    if ping_ms < 50.0 {
        "Excellent"
    } else if ping_ms < 100.0 {
        "Good"
    } else if ping_ms < 200.0 {
        "Average"
    } else {
        "Poor"
    }
}

async fn measure(ctx: &PluginContext, message: &Message, text: &str) -> Result<f64, BotError> {
    let start = Instant::now();
    ctx.reply(message, text).await?;
    Ok(start.elapsed().as_secs_f64() * 1000.0)
}

async fn ping(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let ping_ms = measure(ctx, &message, "Pinging...").await?;
    let text = format!(
        "Pong!\n\nResponse Time: {:.2}ms\nQuality: {}",
        ping_ms,
        quality(ping_ms)
    );
    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

async fn pings(ctx: &PluginContext, message: Message) -> Result<(), BotError> {
    let command = ctx.command(&message);
    let samples = match command.as_ref().and_then(|c| c.arg(0)) {
        None => DEFAULT_SAMPLES,
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) if (1..=MAX_SAMPLES).contains(&n) => n,
            _ => return reply_usage(ctx, &message, "pings [1-10]").await,
        },
    };

    let mut times = Vec::with_capacity(samples);
    for i in 1..=samples {
        times.push(measure(ctx, &message, &format!("Ping test {}/{}...", i, samples)).await?);
    }

    let avg = times.iter().sum::<f64>() / times.len() as f64;
    let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = times.iter().cloned().fold(0.0, f64::max);

    let mut text = format!(
        "Detailed Ping Results\n\nAverage: {:.2}ms\nMinimum: {:.2}ms\nMaximum: {:.2}ms\nQuality: {}\n",
        avg,
        min,
        max,
        quality(avg)
    );
    for (i, t) in times.iter().enumerate() {
        text.push_str(&format!("\nTest {}: {:.2}ms", i + 1, t));
    }

    ctx.reply(&message, &text).await?;
    ctx.record_command(&message).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(quality(10.0), "Excellent");
        assert_eq!(quality(75.0), "Good");
        assert_eq!(quality(150.0), "Average");
        assert_eq!(quality(500.0), "Poor");
    }
}
