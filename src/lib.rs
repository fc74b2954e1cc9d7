//! AutoML Batch Prediction Engine
//!
//! This library drives a guided batch-classification workflow: a wizard state
//! machine collects the source table and model configuration, then a bounded
//! concurrency job runner sends each record's image to a Google AutoML model
//! and writes the predicted label and confidence back to the table. Records
//! that already carry a prediction are skipped, so an interrupted run resumes
//! without repeating remote calls.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
