use dashmap::DashMap;
use std::sync::Arc;

use crate::model::{Movie, MovieId};

/// Last-known movie data by id, shared between search and rating.
///
/// New evaluated entries are hydrated from here, so a movie has to be seen
/// (in search results or the preference list) before it can be rated.
#[derive(Clone, Debug, Default)]
pub struct KnownMovies {
    movies: Arc<DashMap<MovieId, Movie>>,
}

impl KnownMovies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    pub fn remember_all<'a>(&self, movies: impl IntoIterator<Item = &'a Movie>) {
        for movie in movies {
            self.remember(movie.clone());
        }
    }

    pub fn get(&self, id: MovieId) -> Option<Movie> {
        self.movies.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.movies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}
