use std::hash::Hash;

use crate::error::{Error, Result};

/// Trait for bulk loading. Implemented once per entity type and supplied to a
/// loader at construction time.
#[async_trait::async_trait]
pub trait Loader<K: Send + Sync + Hash + Eq + Clone + 'static>: Send + Sync + 'static {
    /// Type of value.
    type Value: Send + Sync + Clone + 'static;

    /// Type of error. Cloned when one failure is fanned out to several
    /// waiters, so wrap heavyweight errors in an `Arc`.
    type Error: Send + Sync + Clone + 'static;

    /// Load the data set specified by the `keys`. Results must be positional:
    /// index `i` of the output corresponds to `keys[i]`.
    async fn load(&self, keys: &[K]) -> LoadResult<Self::Value, Self::Error>;
}

/// Positional output of one [`Loader::load`] call.
///
/// `errors` takes one of three shapes:
/// - empty: total success, `values` must be the same length as the keys;
/// - length 1: a single error applied uniformly to every key in the batch;
/// - same length as the keys: per-key, `None` marking the successful indices.
///   `values` must still be full length; entries at failed indices are never
///   read, so any placeholder (e.g. `Default::default()`) will do.
///
/// Anything else is malformed and resolves every key to
/// [`Error::MismatchedLengths`].
#[derive(Clone, Debug)]
pub struct LoadResult<V, E> {
    pub values: Vec<V>,
    pub errors: Vec<Option<E>>,
}

impl<V, E> LoadResult<V, E> {
    /// Total success.
    pub fn values(values: Vec<V>) -> Self {
        LoadResult { values, errors: Vec::new() }
    }

    /// Uniform failure of the whole batch.
    pub fn error(error: E) -> Self {
        LoadResult { values: Vec::new(), errors: vec![Some(error)] }
    }

    /// Partial failure with a per-key error slice.
    pub fn partial(values: Vec<V>, errors: Vec<Option<E>>) -> Self {
        LoadResult { values, errors }
    }

    /// Resolves the shape against `key_count` into one result per key.
    pub(crate) fn into_per_key(self, key_count: usize) -> Vec<Result<V, E>>
    where
        V: Clone,
        E: Clone,
    {
        let LoadResult { values, errors } = self;

        let mismatch = |values: &Vec<V>, errors: &Vec<Option<E>>| {
            vec![
                Err(Error::MismatchedLengths {
                    keys: key_count,
                    values: values.len(),
                    errors: errors.len(),
                });
                key_count
            ]
        };

        // A single error covers every key in the batch.
        if errors.len() == 1 && key_count != 1 {
            return match &errors[0] {
                Some(error) => vec![Err(Error::Loader(error.clone())); key_count],
                None if values.len() == key_count => values.into_iter().map(Ok).collect(),
                None => mismatch(&values, &errors),
            };
        }

        if errors.is_empty() {
            if values.len() != key_count {
                return mismatch(&values, &errors);
            }
            return values.into_iter().map(Ok).collect();
        }

        if errors.len() != key_count {
            return mismatch(&values, &errors);
        }

        // Values are only consulted at the successful indices, so an
        // all-error batch may leave them empty.
        let needs_values = errors.iter().any(|error| error.is_none());
        if needs_values && values.len() != key_count {
            return mismatch(&values, &errors);
        }

        errors
            .into_iter()
            .enumerate()
            .map(|(index, error)| match error {
                Some(error) => Err(Error::Loader(error)),
                None => Ok(values[index].clone()),
            })
            .collect()
    }
}

impl<V: Default, E> LoadResult<V, E> {
    /// Builds the positional shape out of one `Result` per key, padding the
    /// failed indices with `V::default()`.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<V, E>>,
    {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(value) => {
                    values.push(value);
                    errors.push(None);
                }
                Err(error) => {
                    values.push(V::default());
                    errors.push(Some(error));
                }
            }
        }
        LoadResult { values, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let result = LoadResult::<u32, String>::values(vec![1, 2, 3]);
        let per_key = result.into_per_key(3);
        pretty_assertions::assert_eq!(per_key, vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[test]
    fn test_uniform_error_shape() {
        let result = LoadResult::<u32, String>::error("down".to_string());
        let per_key = result.into_per_key(3);
        pretty_assertions::assert_eq!(per_key, vec![Err(Error::Loader("down".to_string())); 3]);
    }

    #[test]
    fn test_positional_shape() {
        let result =
            LoadResult::partial(vec![1, 0, 3], vec![None, Some("missing".to_string()), None]);
        let per_key = result.into_per_key(3);
        pretty_assertions::assert_eq!(
            per_key,
            vec![Ok(1), Err(Error::Loader("missing".to_string())), Ok(3)]
        );
    }

    #[test]
    fn test_single_key_positional_error() {
        let result = LoadResult::<u32, String>::partial(vec![0], vec![Some("nope".to_string())]);
        let per_key = result.into_per_key(1);
        pretty_assertions::assert_eq!(per_key, vec![Err(Error::Loader("nope".to_string()))]);
    }

    #[test]
    fn test_malformed_error_length() {
        let result = LoadResult::<u32, String>::partial(vec![1, 2, 3], vec![None, None]);
        let per_key = result.into_per_key(3);
        pretty_assertions::assert_eq!(
            per_key,
            vec![Err(Error::MismatchedLengths { keys: 3, values: 3, errors: 2 }); 3]
        );
    }

    #[test]
    fn test_malformed_value_length() {
        let result = LoadResult::<u32, String>::values(vec![1, 2]);
        let per_key = result.into_per_key(3);
        pretty_assertions::assert_eq!(
            per_key,
            vec![Err(Error::MismatchedLengths { keys: 3, values: 2, errors: 0 }); 3]
        );
    }

    #[test]
    fn test_from_results_pads_failures() {
        let result = LoadResult::from_results(vec![Ok(7), Err("gone".to_string()), Ok(9)]);
        pretty_assertions::assert_eq!(result.values, vec![7, 0, 9]);
        pretty_assertions::assert_eq!(result.errors, vec![None, Some("gone".to_string()), None]);
    }
}
