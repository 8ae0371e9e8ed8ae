use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsig_parser::Parser;

// A medium-size CommonJS module with a prototype-based class
const JAVASCRIPT_SOURCE: &str = r#"
'use strict';

var EventEmitter = require('events').EventEmitter;
var util = require('util');

module.exports = BatchClient;

/*@jsig
  BatchClient : (this: BatchClient, channel: Channel, opts: Object) => void
*/
function BatchClient(channel, opts) {
    EventEmitter.call(this);
    this.channel = channel;
    this.timeout = opts.timeout || 500;
    this.retries = 0;
    this.pending = {};
}

util.inherits(BatchClient, EventEmitter);

BatchClient.prototype.sendRequest = function sendRequest(key, value) {
    var self = this;
    var id = ++self.retries;
    self.pending[id] = { key: key, value: value, started: Date.now() };
    self.channel.send(key, value, function onResponse(err, res) {
        delete self.pending[id];
        if (err) {
            return self.emit('error', err);
        }
        self.emit('response', res);
    });
    return id;
};

BatchClient.prototype.flush = function flush() {
    var keys = Object.keys(this.pending);
    for (var i = 0; i < keys.length; i++) {
        var entry = this.pending[keys[i]];
        if (Date.now() - entry.started > this.timeout) {
            this.emit('timeout', entry);
        }
    }
    switch (keys.length) {
        case 0: return 'idle';
        case 1: return 'single';
        default: return 'busy';
    }
};

function sum(list) {
    var total = 0;
    for (var k in list) {
        total += typeof list[k] === 'number' ? list[k] : 0;
    }
    return total;
}
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_module", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let result = Parser::new(&arena, "batch-client.js", black_box(JAVASCRIPT_SOURCE)).parse_source_file();
            black_box(result.source_file.statements.len())
        })
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
