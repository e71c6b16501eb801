//! # kmermaid
//!
//! `kmermaid` counts, deduplicates, and localizes fixed-length substrings
//! (k-mers) across large FASTA collections using a batched external-sort
//! and k-way merge, rather than in-memory hashing — so collections whose
//! k-mer population vastly exceeds RAM still complete in bounded memory.
//!
//! The pipeline has three stages:
//!
//! 1. **Batching** ([`batcher`], [`batch`], [`sequence`]): scan FASTA
//!    records into fixed-length k-mers, sort each bounded batch, and spill
//!    it to a scratch directory.
//! 2. **Merging** ([`crawler`]): a k-way merge over every sorted batch,
//!    grouping occurrences of the same sequence together in ascending
//!    order. [`seqcount_batcher`] interposes a second tier of batching when
//!    the batch count would otherwise exceed the process's open-file budget
//!    ([`fdlimit`]).
//! 3. **Joining** ([`joiner`]): reduces each merged group into one of four
//!    artifacts — unique k-mers, a sequence-count table, or per-position
//!    abundance vectors ([`abundance`]), optionally "masked" to tolerate
//!    colliding positions.
//!
//! [`cli`], [`config`], and [`run`] wire the above into the three
//! `kmermaid` subcommands: `batch`, `count`, and `uniq`.

pub mod abundance;
pub mod alphabet;
pub mod batch;
pub mod batcher;
pub mod cli;
pub mod config;
pub mod coords;
pub mod crawler;
pub mod error;
pub mod fdlimit;
pub mod joiner;
pub mod progress;
pub mod reader;
pub mod run;
pub mod sequence;
pub mod seqcount_batcher;
