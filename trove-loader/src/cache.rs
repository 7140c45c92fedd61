use std::sync::{Arc, Once};
use trove_base::{HashMap, Model, ModelId, ModelName};

/// A model owned by the cache, along with the once-only state of its post-load hook
pub struct CachedModel {
    model: Arc<Model>,
    post_load: Once,
}

impl CachedModel {
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn id(&self) -> ModelId {
        self.model.id
    }

    /// Runs `f` the first time this is called for the model. Concurrent callers block until the
    /// first call has finished.
    pub fn run_post_load<F: FnOnce(&Model)>(
        &self,
        f: F,
    ) {
        self.post_load.call_once(|| f(&self.model));
    }

    pub fn is_post_load_complete(&self) -> bool {
        self.post_load.is_completed()
    }
}

/// Maps model names to loaded models and owns every distinct model loaded in a session.
///
/// Not synchronized on its own. The loader keeps it behind the shared lock so that a miss
/// followed by an insert can't race with another thread doing the same.
#[derive(Default)]
pub struct ModelCache {
    // Requested names and resolved paths, both map to the id of the model they loaded
    lookup: HashMap<ModelName, ModelId>,
    // Indexed by ModelId
    models: Vec<Arc<CachedModel>>,
}

impl ModelCache {
    pub fn find(
        &self,
        name: &str,
    ) -> Option<&Arc<CachedModel>> {
        let id = self.lookup.get(name)?;
        Some(&self.models[id.index()])
    }

    pub fn get(
        &self,
        id: ModelId,
    ) -> Option<&Arc<CachedModel>> {
        self.models.get(id.index())
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.lookup.contains_key(name)
    }

    /// Takes ownership of `model` and files it under `name` and, if given, `alias` (usually the
    /// path the name resolved to).
    ///
    /// If either key already maps to a model, the new model is dropped and the existing one is
    /// returned along with `false`. Whichever key was missing is pointed at the existing model.
    /// This is what guarantees a single retained model per name when two loads race.
    pub fn insert(
        &mut self,
        name: ModelName,
        alias: Option<ModelName>,
        mut model: Model,
    ) -> (Arc<CachedModel>, bool) {
        let existing = self
            .lookup
            .get(&name)
            .or_else(|| alias.as_ref().and_then(|alias| self.lookup.get(alias)))
            .copied();

        if let Some(existing_id) = existing {
            log::debug!(
                "Model {:?} already cached as {}, discarding duplicate",
                name,
                existing_id
            );
            self.add_alias(name, existing_id);
            if let Some(alias) = alias {
                self.add_alias(alias, existing_id);
            }
            return (self.models[existing_id.index()].clone(), false);
        }

        let id = ModelId(self.models.len() as u32);
        model.id = id;
        model.name = name.clone();

        let cached = Arc::new(CachedModel {
            model: Arc::new(model),
            post_load: Once::new(),
        });
        self.models.push(cached.clone());

        let old = self.lookup.insert(name, id);
        assert!(old.is_none());
        if let Some(alias) = alias {
            self.add_alias(alias, id);
        }

        log::debug!("Cached model {:?} as {}", cached.model.name, id);
        (cached, true)
    }

    /// Points `alias` at an already cached model. Existing entries are left alone.
    pub fn add_alias(
        &mut self,
        alias: ModelName,
        id: ModelId,
    ) -> bool {
        assert!(id.index() < self.models.len());
        if self.lookup.contains_key(&alias) {
            return false;
        }

        self.lookup.insert(alias, id);
        true
    }

    /// Every distinct model, in id order
    pub fn all(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.iter().map(|cached| &cached.model)
    }

    /// Number of distinct models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Number of keys, including aliases
    pub fn key_count(&self) -> usize {
        self.lookup.len()
    }

    /// Drops the cache's ownership of every model and returns how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.models.len();
        for cached in self.models.drain(..) {
            log::trace!("Free model {:?} ({})", cached.model.name, cached.model.id);
        }
        self.lookup.clear();
        count
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use trove_base::{ModelFormat, ModelPiece};

    fn model() -> Model {
        Model::new(ModelFormat::S3o, ModelPiece::new("root"))
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut cache = ModelCache::default();
        let (a, inserted_a) = cache.insert(ModelName::new("a"), None, model());
        let (b, inserted_b) = cache.insert(ModelName::new("b"), None, model());

        assert!(inserted_a && inserted_b);
        assert_eq!(a.id(), ModelId(0));
        assert_eq!(b.id(), ModelId(1));
        assert_eq!(a.model().name.as_str(), "a");
        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(cache.get(ModelId(1)).unwrap(), &b));
    }

    #[test]
    fn second_insert_returns_existing() {
        let mut cache = ModelCache::default();
        let (first, _) = cache.insert(ModelName::new("unit_a"), None, model());
        let (second, inserted) = cache.insert(ModelName::new("unit_a"), None, model());

        assert!(!inserted);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn alias_shares_model() {
        let mut cache = ModelCache::default();
        let (first, _) = cache.insert(
            ModelName::new("unit_a"),
            Some(ModelName::new("units/unit_a.m3")),
            model(),
        );

        assert!(Arc::ptr_eq(cache.find("units/unit_a.m3").unwrap(), &first));

        // A different name that resolved to the same file does not create a second model
        let (other, inserted) = cache.insert(
            ModelName::new("unit_a_alt"),
            Some(ModelName::new("units/unit_a.m3")),
            model(),
        );
        assert!(!inserted);
        assert!(Arc::ptr_eq(&other, &first));
        assert!(Arc::ptr_eq(cache.find("unit_a_alt").unwrap(), &first));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.key_count(), 3);
    }

    #[test]
    fn clear_releases_models() {
        let mut cache = ModelCache::default();
        let (cached, _) = cache.insert(ModelName::new("a"), None, model());
        let model = cached.model().clone();
        drop(cached);

        assert_eq!(cache.clear(), 1);
        assert!(cache.find("a").is_none());
        assert!(cache.is_empty());
        assert_eq!(Arc::strong_count(&model), 1);
    }

    #[test]
    fn post_load_runs_once() {
        let mut cache = ModelCache::default();
        let (cached, _) = cache.insert(ModelName::new("a"), None, model());

        let mut calls = 0;
        cached.run_post_load(|_| calls += 1);
        cached.run_post_load(|_| calls += 1);
        assert_eq!(calls, 1);
        assert!(cached.is_post_load_complete());
    }
}
