//! Typed access to a [`Hyperparameters`] map.
//!
//! Each estimator pulls the keys it understands with a default; whatever is
//! left over is reported as an unknown parameter, so a typo in the YAML grid
//! fails the algorithm instead of being silently ignored.

use std::collections::BTreeSet;

use hpp_core::{Algorithm, Hyperparameters, ParamValue};

use crate::error::ModelError;

pub(crate) struct ParamReader<'a> {
    algorithm: Algorithm,
    values: &'a Hyperparameters,
    seen: BTreeSet<&'a str>,
}

impl<'a> ParamReader<'a> {
    pub(crate) fn new(algorithm: Algorithm, values: &'a Hyperparameters) -> Self {
        Self {
            algorithm,
            values,
            seen: BTreeSet::new(),
        }
    }

    fn take(&mut self, key: &'a str) -> Option<&'a ParamValue> {
        self.seen.insert(key);
        self.values.get(key)
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidParameter {
            algorithm: self.algorithm,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn f64(&mut self, key: &'a str, default: f64) -> Result<f64, ModelError> {
        match self.take(key) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .filter(|x| x.is_finite())
                .ok_or_else(|| self.invalid(key, format!("expected a number, got {v}"))),
        }
    }

    pub(crate) fn usize(&mut self, key: &'a str, default: usize) -> Result<usize, ModelError> {
        match self.take(key) {
            None => Ok(default),
            Some(v) => v
                .as_usize()
                .ok_or_else(|| self.invalid(key, format!("expected a non-negative integer, got {v}"))),
        }
    }

    /// An integer where `null` means unbounded.
    pub(crate) fn opt_usize(&mut self, key: &'a str, default: Option<usize>) -> Result<Option<usize>, ModelError> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::None) => Ok(None),
            Some(v) => v
                .as_usize()
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("expected an integer or null, got {v}"))),
        }
    }

    pub(crate) fn bool(&mut self, key: &'a str, default: bool) -> Result<bool, ModelError> {
        match self.take(key) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(key, format!("expected true or false, got {v}"))),
        }
    }

    /// Raw access for parameters with several accepted shapes.
    pub(crate) fn raw(&mut self, key: &'a str) -> Option<&'a ParamValue> {
        self.take(key)
    }

    pub(crate) fn ensure(&self, ok: bool, key: &str, reason: &str) -> Result<(), ModelError> {
        if ok {
            Ok(())
        } else {
            Err(self.invalid(key, reason))
        }
    }

    /// Fail on any key that was never read.
    pub(crate) fn finish(self) -> Result<(), ModelError> {
        match self.values.keys().find(|k| !self.seen.contains(k.as_str())) {
            Some(unknown) => Err(ModelError::UnknownParameter {
                algorithm: self.algorithm,
                name: unknown.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> Hyperparameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn defaults_apply_to_absent_keys() {
        let p = Hyperparameters::new();
        let mut r = ParamReader::new(Algorithm::Ridge, &p);
        assert_eq!(r.f64("alpha", 1.0).unwrap(), 1.0);
        assert_eq!(r.opt_usize("max_depth", Some(3)).unwrap(), Some(3));
        r.finish().unwrap();
    }

    #[test]
    fn null_means_unbounded() {
        let p = params(&[("max_depth", ParamValue::None)]);
        let mut r = ParamReader::new(Algorithm::DecisionTree, &p);
        assert_eq!(r.opt_usize("max_depth", Some(5)).unwrap(), None);
    }

    #[test]
    fn wrong_type_is_invalid() {
        let p = params(&[("alpha", ParamValue::Bool(true))]);
        let mut r = ParamReader::new(Algorithm::Ridge, &p);
        assert!(matches!(
            r.f64("alpha", 1.0),
            Err(ModelError::InvalidParameter { ref name, .. }) if name == "alpha"
        ));
    }

    #[test]
    fn unread_key_is_unknown() {
        let p = params(&[("alpha", ParamValue::Float(1.0)), ("alhpa", ParamValue::Float(2.0))]);
        let mut r = ParamReader::new(Algorithm::Ridge, &p);
        r.f64("alpha", 1.0).unwrap();
        assert!(matches!(
            r.finish(),
            Err(ModelError::UnknownParameter { ref name, .. }) if name == "alhpa"
        ));
    }
}
