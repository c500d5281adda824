/*!
 * Platform Module
 * Thin wrappers over process-level knobs outside the memory core
 */

pub mod fpu;
pub mod oom;

pub use fpu::FpuMode;
pub use oom::score_adjust;
