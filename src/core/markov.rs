/// Markov chain phrase generator with order-N training.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

/// Returned when the chain has nothing to generate from.
pub const FALLBACK_PHRASE: &str = "technical difficulties";

/// Jargon the chain is re-seeded with on [`MarkovChain::reset`].
const DEFAULT_CORPUS: &str = "
    distributed systems consensus algorithm byzantine fault tolerance
    eventual consistency CAP theorem race condition deadlock mutex
    garbage collection memory leak stack overflow heap corruption
    cache miss branch prediction pipeline stall context switch
    virtual memory page fault segmentation violation kernel panic
    quantum supremacy neural architecture tensor flow gradient descent
    backpropagation activation function loss landscape optimization
    container orchestration service mesh circuit breaker load balancer
    microservice architecture event sourcing CQRS saga pattern
    blockchain immutable ledger smart contract proof of work
    machine learning deep learning reinforcement learning transfer
    natural language processing computer vision generative adversarial
    edge computing fog computing serverless lambda function
    kubernetes docker swarm container registry helm chart
    continuous integration continuous deployment infrastructure code
    test driven development behavior driven agile scrum kanban
    object oriented functional programming reactive streams
    asynchronous programming callback promise async await
    RESTful API GraphQL gRPC websocket protocol buffer
    SQL NoSQL ACID BASE CAP eventual consistency
    indexing sharding partitioning replication clustering
    encryption hashing salting JWT OAuth SAML SSO
    firewall VPN proxy reverse proxy CDN WAF DDoS
    monitoring logging tracing metrics alerting observability
";

/// An n-gram key: `order` consecutive tokens.
type NGram = Vec<String>;

/// Word-level Markov chain of configurable order.
///
/// Successor lists keep duplicates so that repeated transitions are drawn
/// proportionally to how often they were observed.
#[derive(Debug, Clone)]
pub struct MarkovChain {
    order: usize,
    transitions: FxHashMap<NGram, Vec<String>>,
    /// Keys in first-seen order, for uniform draws over the table.
    keys: Vec<NGram>,
    starters: Vec<NGram>,
    starter_set: FxHashSet<NGram>,
}

impl Default for MarkovChain {
    /// An order-1 chain seeded with the built-in jargon corpus.
    fn default() -> Self {
        let mut chain = Self::new(1);
        chain.reset();
        chain
    }
}

impl MarkovChain {
    /// Create an empty chain. Orders below 1 are raised to 1.
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
            transitions: FxHashMap::default(),
            keys: Vec::new(),
            starters: Vec::new(),
            starter_set: FxHashSet::default(),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct n-gram keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn starters(&self) -> &[NGram] {
        &self.starters
    }

    /// Successors observed after `key`, in training order.
    pub fn successors(&self, key: &[String]) -> Option<&[String]> {
        self.transitions.get(key).map(Vec::as_slice)
    }

    /// Append a token sequence to the transition table.
    ///
    /// A key becomes a starter if it is the first key of this call or if
    /// its first token begins with an uppercase letter.
    pub fn train<S: AsRef<str>>(&mut self, words: &[S]) {
        let words: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();
        if words.len() <= self.order {
            return;
        }

        for (i, window) in words.windows(self.order + 1).enumerate() {
            let key: NGram = window[..self.order].to_vec();
            let next = window[self.order].clone();

            let starts_upper = key[0].chars().next().is_some_and(char::is_uppercase);
            if (i == 0 || starts_upper) && self.starter_set.insert(key.clone()) {
                self.starters.push(key.clone());
            }

            match self.transitions.get_mut(&key) {
                Some(successors) => successors.push(next),
                None => {
                    self.keys.push(key.clone());
                    self.transitions.insert(key, vec![next]);
                }
            }
        }

        if self.starters.is_empty() && !self.keys.is_empty() {
            self.starters = self.keys.clone();
            self.starter_set = self.keys.iter().cloned().collect();
        }
    }

    /// Split free text on whitespace and train on it.
    pub fn add_corpus(&mut self, text: &str) {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.train(&words);
    }

    /// Generate up to `length` whitespace-joined tokens.
    ///
    /// With `start_word`, begins from a random key containing that word when
    /// one exists. Dead ends restart from a random key. An empty chain
    /// yields [`FALLBACK_PHRASE`].
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        length: usize,
        start_word: Option<&str>,
    ) -> String {
        if self.keys.is_empty() {
            return FALLBACK_PHRASE.to_string();
        }

        let mut current = self.pick_start(rng, start_word);
        let mut result: Vec<String> = current.clone();
        result.truncate(length);

        while result.len() < length {
            match self.transitions.get(&current) {
                Some(successors) => {
                    let Some(next) = successors.choose(rng) else {
                        break;
                    };
                    result.push(next.clone());

                    // Slide the window: drop the oldest token, append the newest.
                    current.remove(0);
                    current.push(next.clone());
                }
                None => match self.keys.choose(rng) {
                    Some(key) => current = key.clone(),
                    None => break,
                },
            }
        }

        result.join(" ")
    }

    /// Generate a phrase whose length is drawn uniformly from `min..=max`.
    pub fn generate_sentence<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        min_length: usize,
        max_length: usize,
    ) -> String {
        let length = if min_length >= max_length {
            min_length
        } else {
            rng.gen_range(min_length..=max_length)
        };
        self.generate(rng, length, None)
    }

    /// Clear all learned state and re-seed with the built-in jargon corpus.
    pub fn reset(&mut self) {
        self.transitions.clear();
        self.keys.clear();
        self.starters.clear();
        self.starter_set.clear();
        self.add_corpus(DEFAULT_CORPUS);
    }

    fn pick_start<R: Rng + ?Sized>(&self, rng: &mut R, start_word: Option<&str>) -> NGram {
        if let Some(word) = start_word {
            let matching: Vec<&NGram> = self
                .keys
                .iter()
                .filter(|k| k.iter().any(|t| t == word))
                .collect();
            if let Some(key) = matching.choose(rng) {
                return (*key).clone();
            }
        }

        let pool = if self.starters.is_empty() {
            &self.keys
        } else {
            &self.starters
        };
        pool.choose(rng).cloned().unwrap_or_default()
    }
}
