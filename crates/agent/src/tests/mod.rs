//! Reasoning-loop scenarios driven by scripted capabilities and fake tools.

mod scenarios;
